//! Response cache
//!
//! Caches fully composed answers keyed by the normalized question plus
//! request context (trimester, region, season, diet, conditions). Uses the moka crate
//! for a thread-safe, async-compatible bounded cache.
//!
//! Freshness is checked on read against the entry's insertion instant, so
//! an entry is served only while its age is below the TTL. Stale entries are
//! left in place and overwritten by the next write for the same key.
//!
//! Author: hephaex@gmail.com

use moka::future::Cache;
use nutri_core::{normalize_key, AnswerRequest, CacheConfig, StructuredAnswer};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::filter::{canonical_condition, canonical_diet, canonical_region, canonical_season};

// ============================================================================
// Cache Key
// ============================================================================

/// Key for response cache entries
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    /// Hash of the normalized question text
    question_hash: u64,
    trimester: Option<u8>,
    region: Option<String>,
    season: Option<String>,
    diet: Option<String>,
    /// Canonical conditions, sorted and de-duplicated
    conditions: Vec<String>,
}

impl CacheKey {
    pub fn from_request(request: &AnswerRequest) -> Self {
        let mut conditions: Vec<String> = request
            .conditions
            .iter()
            .filter_map(|c| canonical_condition(c))
            .collect();
        conditions.sort();
        conditions.dedup();

        Self {
            question_hash: hash_text(&normalize_key(&request.question)),
            trimester: request.trimester,
            region: request.region.as_deref().and_then(canonical_region),
            season: request.season.as_deref().and_then(canonical_season),
            diet: request.diet_type.as_deref().and_then(canonical_diet),
            conditions,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedAnswer {
    answer: StructuredAnswer,
    inserted_at: Instant,
}

// ============================================================================
// Response Cache
// ============================================================================

/// TTL cache of composed answers
#[derive(Clone)]
pub struct ResponseCache {
    cache: Cache<CacheKey, CachedAnswer>,
    ttl: Duration,
    stats: Arc<CacheStats>,
}

impl ResponseCache {
    /// Create a cache with default configuration
    pub fn new() -> Self {
        Self::with_config(&CacheConfig::default())
    }

    /// Create a cache with custom configuration
    pub fn with_config(config: &CacheConfig) -> Self {
        let cache = Cache::builder().max_capacity(config.max_capacity).build();

        Self {
            cache,
            ttl: config.ttl(),
            stats: Arc::new(CacheStats::new("response")),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a fresh answer for a request
    ///
    /// Returns `None` when the entry is missing or its age has reached the TTL.
    pub async fn get(&self, request: &AnswerRequest) -> Option<StructuredAnswer> {
        let key = CacheKey::from_request(request);

        match self.cache.get(&key).await {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                self.stats.record_hit();
                Some(entry.answer)
            }
            Some(_) => {
                self.stats.record_stale();
                None
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Store an answer, replacing any previous entry for the same key
    pub async fn set(&self, request: &AnswerRequest, answer: StructuredAnswer) {
        let key = CacheKey::from_request(request);
        self.cache
            .insert(
                key,
                CachedAnswer {
                    answer,
                    inserted_at: Instant::now(),
                },
            )
            .await;
        self.stats.record_write();
    }

    /// Clear all cached answers
    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        self.stats.reset();
    }

    /// Get cache statistics
    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    /// Get current cache size
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Cache Statistics
// ============================================================================

/// Cache statistics tracker
#[derive(Debug)]
pub struct CacheStats {
    name: String,
    hits: AtomicU64,
    misses: AtomicU64,
    stale: AtomicU64,
    writes: AtomicU64,
}

impl CacheStats {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stale: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_stale(&self) {
        self.stale.fetch_add(1, Ordering::Relaxed);
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.stale.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Reads that found an expired entry
    pub fn stale(&self) -> u64 {
        self.stale.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Total lookups (hits + misses + stale reads)
    pub fn total_requests(&self) -> u64 {
        self.hits() + self.misses() + self.stale()
    }

    /// Hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }

    /// Get a snapshot of statistics
    pub fn report(&self) -> CacheStatsReport {
        CacheStatsReport {
            name: self.name.clone(),
            hits: self.hits(),
            misses: self.misses(),
            stale: self.stale(),
            writes: self.writes(),
            hit_rate: self.hit_rate(),
            total_requests: self.total_requests(),
        }
    }
}

/// Snapshot of cache statistics for reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatsReport {
    pub name: String,
    pub hits: u64,
    pub misses: u64,
    pub stale: u64,
    pub writes: u64,
    pub hit_rate: f64,
    pub total_requests: u64,
}

/// Hash text to a u64 key
fn hash_text(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}
