//! Nutri RAG - Retrieval-and-fallback answer engine
//!
//! This crate answers pregnancy nutrition questions in tiers:
//! - Response cache (keyed by question and preference context)
//! - Local dataset lookup (keyword, exact and fuzzy matches)
//! - External model, time-boxed and rate limited
//! - Static guidance when nothing else answers
//!
//! Indexes and records are shared read-only after startup. The response
//! cache and the rate limiter live inside one `NutritionAssistant`, so when
//! several workers each build their own, each worker caches and counts
//! independently.
//!
//! Author: hephaex@gmail.com

use std::sync::Arc;

use nutri_core::{
    AnswerRequest, AnswerSource, AppConfig, Intent, LlmClient, PreferenceQuery, Result,
    StructuredAnswer,
};
use tokio::time::Instant;
use tracing::{debug, info};

pub mod cache;
pub mod compose;
pub mod fallback;
pub mod filter;
pub mod guidelines;
pub mod index;
pub mod intent;
pub mod knowledge;
pub mod llm;
pub mod prompt;
pub mod rate_limit;

pub use cache::{CacheKey, CacheStats, CacheStatsReport, ResponseCache};
pub use compose::{ComposedAnswer, Composer, DiscoveryOrder, RankingStrategy};
pub use fallback::{FallbackAdapter, FallbackError};
pub use filter::{CanonicalQuery, FilterOutcome, PreferenceFilter};
pub use index::{similarity, FastIndex, FuzzyMatch};
pub use intent::{classify_intent, extract_keywords, paraphrase_query};
pub use knowledge::{AvailableOptions, DatasetStatistics, KnowledgeBase};
pub use llm::{create_llm_client, OllamaClient, OpenAiClient};
pub use rate_limit::RateLimiter;

// ============================================================================
// Assistant
// ============================================================================

/// Question answering front door
pub struct NutritionAssistant {
    /// Records and indexes
    knowledge: Arc<KnowledgeBase>,

    /// Configuration
    config: AppConfig,

    /// Cached structured answers
    cache: ResponseCache,

    /// Sliding-window limit on external model calls
    limiter: Arc<RateLimiter>,

    /// Time-boxed external model
    fallback: FallbackAdapter,

    /// Ordering applied before the top-N cut
    ranking: Arc<dyn RankingStrategy>,
}

impl NutritionAssistant {
    /// Create an assistant, building the LLM client from configuration
    pub fn new(knowledge: Arc<KnowledgeBase>, config: AppConfig) -> Self {
        let client = create_llm_client(&config.llm);
        Self::with_parts(knowledge, config, client)
    }

    fn with_parts(
        knowledge: Arc<KnowledgeBase>,
        config: AppConfig,
        client: Option<Arc<dyn LlmClient>>,
    ) -> Self {
        let fallback = FallbackAdapter::from_client(client, config.llm.timeout());
        Self {
            cache: ResponseCache::with_config(&config.cache),
            limiter: Arc::new(RateLimiter::new(config.rate_limit.per_minute)),
            fallback,
            ranking: Arc::new(DiscoveryOrder),
            knowledge,
            config,
        }
    }

    /// Replace the external model client (`None` disables the fallback tier)
    pub fn with_llm_client(mut self, client: Option<Arc<dyn LlmClient>>) -> Self {
        self.fallback = FallbackAdapter::from_client(client, self.config.llm.timeout());
        self
    }

    /// Share a rate limiter with other assistants
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Replace the ranking strategy
    pub fn with_ranking(mut self, ranking: Arc<dyn RankingStrategy>) -> Self {
        self.ranking = ranking;
        self
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Answer one question
    ///
    /// Only validation failures are errors; every other path produces an
    /// answer.
    pub async fn answer(&self, request: &AnswerRequest) -> Result<StructuredAnswer> {
        let start_time = Instant::now();

        request.validate_bounds(
            self.config.answer.min_question_chars,
            self.config.answer.max_question_chars,
        )?;

        // 1. Cache
        if let Some(mut cached) = self.cache.get(request).await {
            debug!("Cache hit");
            cached.source = AnswerSource::DatabaseCache;
            cached.from_cache = true;
            cached.response_time = start_time.elapsed().as_secs_f64();
            return Ok(cached);
        }

        // 2. Analyze
        let question = request.question.trim();
        let intent = classify_intent(question);
        let keywords = extract_keywords(
            question,
            &[
                self.knowledge.guidance_index(),
                self.knowledge.meal_index(),
            ],
        );
        let query_reflection = paraphrase_query(question, &keywords);
        debug!("Query analyzed: intent={}, keywords={:?}", intent, keywords);

        // 3. Local dataset
        let composer = Composer::new(&self.knowledge, &self.config.answer, self.ranking.as_ref());
        let (composed, source) = match composer.compose(request, intent, &keywords) {
            Some(composed) => {
                debug!(
                    "Answered from dataset: {} dos, {} donts",
                    composed.dos.len(),
                    composed.donts.len()
                );
                (composed, AnswerSource::Dataset)
            }
            None => self.answer_remotely(request, intent, &keywords).await,
        };

        let answer = StructuredAnswer {
            query_reflection,
            answer: composed.answer,
            dos: composed.dos,
            donts: composed.donts,
            keywords,
            intent,
            source,
            response_time: start_time.elapsed().as_secs_f64(),
            from_cache: false,
            relaxed_filters: composed.relaxed,
        };

        if matches!(source, AnswerSource::Dataset | AnswerSource::AiModel) {
            self.cache.set(request, answer.clone()).await;
        }

        info!(
            "Answered intent={} source={} in {:.3}s",
            answer.intent, answer.source, answer.response_time
        );
        Ok(answer)
    }

    /// Rate check, external model, then static guidance
    async fn answer_remotely(
        &self,
        request: &AnswerRequest,
        intent: Intent,
        keywords: &[String],
    ) -> (ComposedAnswer, AnswerSource) {
        let top_n = self.config.answer.top_n;

        if self.fallback.is_available() {
            if self.limiter.allow() {
                let prompt = prompt::fallback_prompt(request, intent, keywords);
                debug!("Calling external model with prompt length: {} chars", prompt.len());
                let reply = self.fallback.ask(&prompt).await;
                if !reply.is_empty() {
                    return (
                        compose::compose_fallback(&reply, intent, keywords, top_n),
                        AnswerSource::AiModel,
                    );
                }
            } else {
                debug!("Rate limit reached, skipping external model");
            }
        }

        debug!("Falling back to static guidance");
        (
            compose::compose_static(intent, keywords, request.trimester, top_n),
            AnswerSource::Generic,
        )
    }

    /// Answer several questions concurrently, results in input order
    pub async fn answer_batch(&self, requests: &[AnswerRequest]) -> Vec<Result<StructuredAnswer>> {
        futures::future::join_all(requests.iter().map(|request| self.answer(request))).await
    }

    /// Meals matching the preferences, relaxing constraints if needed
    pub fn preference_filter(&self, query: &PreferenceQuery) -> FilterOutcome {
        self.knowledge.preference_filter(query)
    }

    pub fn statistics(&self) -> DatasetStatistics {
        self.knowledge.statistics()
    }

    pub fn available_options(&self) -> AvailableOptions {
        self.knowledge.available_options()
    }

    pub fn cache_stats(&self) -> CacheStatsReport {
        self.cache.stats().report()
    }

    /// Drop every cached answer
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }
}
