//! End-to-end tests for the answer state machine

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nutri_core::{
    AnswerRequest, AnswerSource, AppConfig, Attribute, Dimension, Intent, LlmClient, NutriError,
    Polarity, PreferenceQuery, Provenance, Record, Result,
};
use nutri_ingest::DatasetLoader;
use nutri_rag::guidelines::AI_NOTE;
use nutri_rag::{FastIndex, KnowledgeBase, NutritionAssistant, RateLimiter};

// ============================================================================
// Fixtures
// ============================================================================

struct Counting {
    calls: AtomicUsize,
    delay: Duration,
    reply: &'static str,
}

impl Counting {
    fn new(delay: Duration, reply: &'static str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            reply,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for Counting {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(self.reply.to_string())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

fn meal(name: &str, region: &str, season: &str, trimester: &str) -> Record {
    Record::meal(name)
        .with_provenance(Provenance {
            region: Some(region.to_string()),
            diet: Some("veg".to_string()),
            season: Some(season.to_string()),
            source_file: format!("{region}veg_cleaned.csv"),
            category: "regional".to_string(),
            ..Default::default()
        })
        .with_trimester(trimester)
        .with_attribute(Attribute::Nutrients, "Protein, fiber")
}

fn knowledge() -> Arc<KnowledgeBase> {
    Arc::new(KnowledgeBase::from_records(
        vec![
            meal("Rajma Chawal", "north", "summer", "2nd trimester"),
            meal("Sarson Saag", "north", "winter", "3"),
            meal("Idli", "south", "monsoon", "all"),
        ],
        vec![
            Record::guidance("papaya", Polarity::Dont)
                .with_attribute(Attribute::Description, "unripe papaya contains latex"),
            Record::guidance("papaya", Polarity::Do)
                .with_attribute(Attribute::Description, "ripe papaya is safe in moderation"),
            Record::guidance("Raw Sprouts", Polarity::Dont).with_attribute(Attribute::Risk, "Bacteria"),
        ],
    ))
}

fn assistant() -> NutritionAssistant {
    NutritionAssistant::new(knowledge(), AppConfig::default())
}

// ============================================================================
// Local tier
// ============================================================================

#[tokio::test]
async fn test_papaya_dos_and_donts() {
    let assistant = assistant();
    let answer = assistant
        .answer(&AnswerRequest::new("Can I eat papaya during pregnancy?"))
        .await
        .unwrap();

    assert_eq!(answer.intent, Intent::SafetyCheck);
    assert_eq!(answer.source, AnswerSource::Dataset);
    assert!(answer.keywords.contains(&"papaya".to_string()));
    assert_eq!(answer.dos.len(), 1);
    assert_eq!(answer.donts.len(), 1);
    assert_eq!(answer.dos[0].reason, "ripe papaya is safe in moderation");
    assert_eq!(answer.donts[0].reason, "unripe papaya contains latex");
    assert!(!answer.from_cache);
    assert!(answer.query_reflection.contains("Papaya"));
}

#[tokio::test]
async fn test_relaxed_season_via_filter() {
    let assistant = assistant();
    let outcome = assistant.preference_filter(
        &PreferenceQuery::new()
            .region("North")
            .diet("veg")
            .trimester(2)
            .season("monsoon"),
    );

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].display_name, "Rajma Chawal");
    assert_eq!(outcome.relaxed, vec![Dimension::Season]);
}

#[tokio::test]
async fn test_relaxed_season_via_answer() {
    let assistant = assistant();
    let request = AnswerRequest::new("Suggest a meal plan for me")
        .with_region("North")
        .with_diet("veg")
        .with_trimester(2)
        .with_season("monsoon");

    let answer = assistant.answer(&request).await.unwrap();
    assert_eq!(answer.intent, Intent::MealPlan);
    assert_eq!(answer.source, AnswerSource::Dataset);
    assert_eq!(answer.relaxed_filters, vec![Dimension::Season]);
    assert_eq!(answer.dos[0].item, "Rajma Chawal");
    assert!(answer.answer.contains("season"));
}

#[tokio::test]
async fn test_short_question_rejected_before_lookup() {
    let assistant = assistant();
    let err = assistant.answer(&AnswerRequest::new("Hi")).await.unwrap_err();

    assert!(matches!(err, NutriError::Validation(_)));
    assert_eq!(assistant.cache_stats().total_requests, 0);
}

#[tokio::test]
async fn test_out_of_range_trimester_rejected() {
    let assistant = assistant();
    let request = AnswerRequest::new("Can I eat papaya?").with_trimester(0);
    assert!(matches!(
        assistant.answer(&request).await,
        Err(NutriError::Validation(_))
    ));
}

// ============================================================================
// Cache
// ============================================================================

#[tokio::test]
async fn test_second_identical_request_hits_cache() {
    let assistant = assistant();
    let request = AnswerRequest::new("Can I eat papaya during pregnancy?").with_trimester(1);

    let first = assistant.answer(&request).await.unwrap();
    let second = assistant.answer(&request).await.unwrap();

    assert_eq!(second.source, AnswerSource::DatabaseCache);
    assert!(second.from_cache);
    assert_eq!(second.answer, first.answer);
    assert_eq!(second.dos, first.dos);

    let stats = assistant.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.writes, 1);
}

#[tokio::test]
async fn test_context_change_misses_cache() {
    let assistant = assistant();
    let request = AnswerRequest::new("Can I eat papaya during pregnancy?");

    assistant.answer(&request).await.unwrap();
    let other = assistant
        .answer(&request.clone().with_region("south"))
        .await
        .unwrap();

    assert_eq!(other.source, AnswerSource::Dataset);
    assert_eq!(assistant.cache_stats().hits, 0);
}

#[tokio::test]
async fn test_condition_change_misses_cache() {
    let tagged = |name: &str, condition: &str| {
        Record::meal(name).with_provenance(Provenance {
            region: Some("north".to_string()),
            diet: Some("veg".to_string()),
            condition: Some(condition.to_string()),
            ..Default::default()
        })
    };
    let knowledge = Arc::new(KnowledgeBase::from_records(
        vec![
            tagged("Methi Thepla", "gestational_diabetes"),
            tagged("Gulab Jamun", "anemia"),
        ],
        vec![],
    ));
    let assistant = NutritionAssistant::new(knowledge, AppConfig::default());
    let request = AnswerRequest::new("Give me a meal plan");

    let plain = assistant.answer(&request).await.unwrap();
    assert_eq!(plain.dos.len(), 2);

    let gdm = assistant
        .answer(&request.clone().with_condition("gestational diabetes"))
        .await
        .unwrap();
    assert_eq!(gdm.source, AnswerSource::Dataset);
    assert!(!gdm.from_cache);
    let items: Vec<_> = gdm.dos.iter().map(|d| d.item.as_str()).collect();
    assert_eq!(items, vec!["Methi Thepla"]);
    assert_eq!(assistant.cache_stats().hits, 0);
}

// ============================================================================
// Rate limit, fallback, static
// ============================================================================

#[tokio::test]
async fn test_rate_limited_goes_static_without_calling_model() {
    let client = Counting::new(Duration::from_millis(10), "should not be used");
    let limiter = Arc::new(RateLimiter::new(1));
    assert!(limiter.allow());

    let assistant = assistant()
        .with_llm_client(Some(client.clone()))
        .with_rate_limiter(limiter);

    let answer = assistant
        .answer(&AnswerRequest::new("Is quinoa safe?"))
        .await
        .unwrap();

    assert_eq!(answer.source, AnswerSource::Generic);
    assert!(!answer.answer.is_empty());
    assert_eq!(client.calls(), 0);
    assert!(answer.response_time < assistant.config().llm.timeout_secs + 0.5);
}

#[tokio::test]
async fn test_no_model_configured_goes_static() {
    let assistant = assistant();
    let answer = assistant
        .answer(&AnswerRequest::new("How much fish oil is fine?"))
        .await
        .unwrap();

    assert_eq!(answer.source, AnswerSource::Generic);
    // Static topic guidance for fish
    assert_eq!(answer.dos[0].item, "Low-mercury fish");
}

#[tokio::test(start_paused = true)]
async fn test_model_answer_is_cached() {
    let client = Counting::new(Duration::from_millis(200), "Jackfruit is fine in moderation.");
    let assistant = assistant().with_llm_client(Some(client.clone()));
    let request = AnswerRequest::new("Is jackfruit okay?");

    let first = assistant.answer(&request).await.unwrap();
    assert_eq!(first.source, AnswerSource::AiModel);
    assert!(first.answer.starts_with("Jackfruit is fine in moderation."));
    assert!(first.answer.ends_with(AI_NOTE));

    let second = assistant.answer(&request).await.unwrap();
    assert_eq!(second.source, AnswerSource::DatabaseCache);
    assert_eq!(client.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_model_timeout_goes_static() {
    let client = Counting::new(Duration::from_secs(10), "too late");
    let assistant = assistant().with_llm_client(Some(client.clone()));
    let request = AnswerRequest::new("Is jackfruit okay?");

    let answer = assistant.answer(&request).await.unwrap();
    assert_eq!(answer.source, AnswerSource::Generic);
    assert!(answer.response_time >= 2.5);
    assert!(answer.response_time < 3.0);

    // Static answers are not cached
    assistant.answer(&request).await.unwrap();
    assert_eq!(client.calls(), 2);
    assert_eq!(assistant.cache_stats().writes, 0);
}

#[tokio::test]
async fn test_batch_keeps_input_order() {
    let assistant = assistant();
    let results = assistant
        .answer_batch(&[
            AnswerRequest::new("Can I eat papaya?"),
            AnswerRequest::new("Hi"),
            AnswerRequest::new("Are raw sprouts dangerous?"),
        ])
        .await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().intent, Intent::SafetyCheck);
    assert!(results[1].is_err());
    let avoid = results[2].as_ref().unwrap();
    assert_eq!(avoid.intent, Intent::FoodsToAvoid);
    assert!(avoid.donts.iter().any(|d| d.item == "Raw Sprouts"));
}

#[tokio::test]
async fn test_answer_serializes_with_source_tag() {
    let assistant = assistant();
    let answer = assistant
        .answer(&AnswerRequest::new("Can I eat papaya?"))
        .await
        .unwrap();

    let json = serde_json::to_value(&answer).unwrap();
    assert_eq!(json["source"], "dataset");
    assert_eq!(json["intent"], "safety_check");
}

// ============================================================================
// Ingested corpus
// ============================================================================

fn write(root: &Path, folder: &str, file: &str, bytes: &[u8]) {
    let dir = root.join(folder);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(file), bytes).unwrap();
}

/// Every indexed name with its exact hit and the names behind each of its words
fn index_snapshot(index: &FastIndex) -> Vec<(String, String, Vec<Vec<String>>)> {
    let mut snapshot: Vec<_> = index
        .names()
        .map(|name| {
            let exact = index
                .exact_lookup(name)
                .map(|r| format!("{}|{}", r.display_name, r.provenance.source_file))
                .unwrap_or_default();
            let by_word = name
                .split_whitespace()
                .map(|word| {
                    index
                        .keyword_lookup(word)
                        .iter()
                        .map(|r| r.name.clone())
                        .collect()
                })
                .collect();
            (name.to_string(), exact, by_word)
        })
        .collect();
    snapshot.sort();
    snapshot
}

#[test]
fn test_reload_builds_identical_indexes() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "data_1",
        "northveg_cleaned.csv",
        b"Dish Name,Meal Type,Benefit\nRajma Chawal,Lunch,Protein\nPalak Paneer,Dinner,Iron\nRajma Chawal,Dinner,Fibre\n",
    );
    write(
        dir.path(),
        "remainingdatasets",
        "foods_to_avoid_during_pregnancy_dataset.csv",
        b"Food,Risk\nRaw Sprouts,Bacteria\nRaw Papaya,Contractions\n",
    );

    let loader = DatasetLoader::new(dir.path());
    let first = KnowledgeBase::load(&loader);
    let second = KnowledgeBase::load(&loader);

    assert!(!first.meal_index().is_empty());
    assert!(!first.guidance_index().is_empty());
    assert_eq!(
        index_snapshot(first.meal_index()),
        index_snapshot(second.meal_index())
    );
    assert_eq!(
        index_snapshot(first.guidance_index()),
        index_snapshot(second.guidance_index())
    );
    assert_eq!(
        first.guidance_index().keyword_lookup("raw").len(),
        second.guidance_index().keyword_lookup("raw").len()
    );
}

#[tokio::test]
async fn test_answers_from_ingested_files() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "data_1",
        "northveg_cleaned.csv",
        b"Dish Name,Meal Type,Benefit\nRajma Chawal,Lunch,Protein\n",
    );
    write(
        dir.path(),
        "remainingdatasets",
        "foods_to_avoid_during_pregnancy_dataset.csv",
        b"Food,Risk\nRaw Sprouts,Bacteria\n",
    );

    let loader = DatasetLoader::new(dir.path());
    let first = KnowledgeBase::load(&loader);
    let second = KnowledgeBase::load(&loader);

    // Reloading the same files gives the same corpus
    assert_eq!(first.statistics().total_meals, second.statistics().total_meals);
    assert_eq!(first.statistics().categories, second.statistics().categories);
    assert_eq!(first.meal_index().len(), second.meal_index().len());

    let assistant = NutritionAssistant::new(Arc::new(first), AppConfig::default());
    let answer = assistant
        .answer(&AnswerRequest::new("Can I eat raw sprouts?"))
        .await
        .unwrap();

    assert_eq!(answer.source, AnswerSource::Dataset);
    assert_eq!(answer.donts[0].item, "Raw Sprouts");
    assert_eq!(answer.donts[0].reason, "Bacteria");
}

#[test]
fn test_vegan_filter_on_builtin_layout() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "data_1",
        "northveg_cleaned.csv",
        b"Dish Name,Meal Type\nPaneer Paratha,Breakfast\n",
    );
    write(
        dir.path(),
        "data_1",
        "northnonveg_cleaned.csv",
        b"Dish Name,Meal Type\nButter Chicken,Dinner\n",
    );
    write(
        dir.path(),
        "data_3",
        "monsoon_diet_pregnant_women.csv",
        b"Dish Name,Meal Type\nMoong Dal Khichdi,Lunch\n",
    );

    let knowledge = KnowledgeBase::load(&DatasetLoader::new(dir.path()));
    let names = |diet: &str| -> Vec<String> {
        knowledge
            .preference_filter(&PreferenceQuery::new().region("north").diet(diet))
            .records
            .iter()
            .map(|r| r.display_name.clone())
            .collect()
    };

    // No built-in file is tagged vegan, so only the generic files answer
    assert_eq!(names("vegan"), vec!["Moong Dal Khichdi"]);
    assert_eq!(names("veg"), vec!["Paneer Paratha", "Moong Dal Khichdi"]);
    assert_eq!(names("non-veg"), vec!["Butter Chicken", "Moong Dal Khichdi"]);
}
