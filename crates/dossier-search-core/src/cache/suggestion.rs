//! Suggestion cache
//!
//! Read-through cache for typeahead responses:
//!
//! ```text
//! CHECK_PRIMARY ─ hit ──────────────────────────────► return
//!       │
//!      miss / backend error / corrupt entry
//!       ▼
//! COMPUTE_FALLBACK ─► POPULATE_PRIMARY (best effort) ─► return
//! ```
//!
//! Every step runs against one deadline so the whole call stays inside the
//! suggest latency budget. Backend failures are logged and counted, never
//! returned.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::model::{EntityType, Language, Suggestion};

use super::{CacheBackend, CacheError};

/// Entry format version, part of every key
const KEY_VERSION: &str = "v1";

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Suggestion cache timing
#[derive(Debug, Clone)]
pub struct SuggestionCacheConfig {
    /// Entry lifetime
    pub ttl: Duration,
    /// Budget for a single backend call
    pub call_timeout: Duration,
    /// Budget for the whole lookup, fallback included
    pub deadline: Duration,
}

impl Default for SuggestionCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            call_timeout: Duration::from_millis(50),
            deadline: Duration::from_millis(190),
        }
    }
}

// ============================================================================
// KEYS AND ENTRIES
// ============================================================================

/// Cache key: normalized prefix + entity type filter + language.
///
/// Entity types are sorted so filter order does not split entries.
pub fn suggestion_key(normalized: &str, entity_types: &[EntityType], language: Language) -> String {
    let mut types: Vec<&str> = entity_types.iter().map(|t| t.as_str()).collect();
    types.sort_unstable();
    types.dedup();
    format!(
        "suggest:{}:{}:{}:{}",
        KEY_VERSION,
        language.as_str(),
        types.join(","),
        normalized
    )
}

/// Stored form of a suggestion. Keeps the classification level that the
/// wire form drops, so cached entries can still be authorized per caller.
#[derive(Serialize, Deserialize)]
struct CachedSuggestion {
    #[serde(flatten)]
    suggestion: Suggestion,
    classification_level: u8,
}

fn encode(suggestions: &[Suggestion]) -> Result<String, CacheError> {
    let entries: Vec<CachedSuggestion> = suggestions
        .iter()
        .map(|s| CachedSuggestion {
            classification_level: s.classification_level,
            suggestion: s.clone(),
        })
        .collect();
    Ok(serde_json::to_string(&entries)?)
}

fn decode(value: &str) -> Result<Vec<Suggestion>, CacheError> {
    let entries: Vec<CachedSuggestion> = serde_json::from_str(value)?;
    Ok(entries
        .into_iter()
        .map(|entry| Suggestion {
            classification_level: entry.classification_level,
            ..entry.suggestion
        })
        .collect())
}

// ============================================================================
// STATS
// ============================================================================

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    degraded: AtomicU64,
    corrupt: AtomicU64,
    populate_failures: AtomicU64,
    populate_skipped: AtomicU64,
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub backend: &'static str,
    pub hits: u64,
    pub misses: u64,
    /// Lookups where the backend failed or timed out
    pub degraded: u64,
    /// Entries that could not be decoded
    pub corrupt: u64,
    pub populate_failures: u64,
    /// Populates skipped because the deadline had passed
    pub populate_skipped: u64,
}

/// Result of [`SuggestionCache::get_or_compute`]
#[derive(Debug, Clone, PartialEq)]
pub struct CacheLookup {
    pub value: Vec<Suggestion>,
    pub cache_hit: bool,
    pub took_ms: u64,
}

// ============================================================================
// SUGGESTION CACHE
// ============================================================================

/// Read-through typeahead cache over a [`CacheBackend`]
pub struct SuggestionCache {
    backend: Arc<dyn CacheBackend>,
    config: SuggestionCacheConfig,
    counters: Counters,
}

impl SuggestionCache {
    pub fn new(backend: Arc<dyn CacheBackend>, config: SuggestionCacheConfig) -> Self {
        Self {
            backend,
            config,
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &SuggestionCacheConfig {
        &self.config
    }

    /// Return the cached value for `key`, or compute, store and return it.
    ///
    /// `compute` receives the time left before the deadline and must finish
    /// inside it. Its error is the only error this returns.
    pub async fn get_or_compute<F, Fut, E>(&self, key: &str, compute: F) -> Result<CacheLookup, E>
    where
        F: FnOnce(Duration) -> Fut,
        Fut: Future<Output = Result<Vec<Suggestion>, E>>,
    {
        let start = Instant::now();
        let deadline = start + self.config.deadline;

        // CHECK_PRIMARY
        if let Some(value) = self.check_primary(key, deadline).await {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(CacheLookup {
                value,
                cache_hit: true,
                took_ms: start.elapsed().as_millis() as u64,
            });
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);

        // COMPUTE_FALLBACK
        let value = compute(remaining(deadline)).await?;

        // POPULATE_PRIMARY
        self.populate(key, &value, deadline).await;

        Ok(CacheLookup {
            value,
            cache_hit: false,
            took_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn check_primary(&self, key: &str, deadline: Instant) -> Option<Vec<Suggestion>> {
        let budget = self.call_budget(deadline);
        let result = match tokio::time::timeout(budget, self.backend.get(key)).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(budget)),
        };

        match result {
            Ok(Some(raw)) => match decode(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    self.counters.corrupt.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(key, error = %e, "Discarding corrupt suggestion cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                self.counters.degraded.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    key,
                    backend = self.backend.name(),
                    error = %e,
                    "Suggestion cache degraded, serving from fallback"
                );
                None
            }
        }
    }

    async fn populate(&self, key: &str, value: &[Suggestion], deadline: Instant) {
        let budget = self.call_budget(deadline);
        if budget.is_zero() {
            self.counters.populate_skipped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key, "Deadline reached, skipping suggestion cache populate");
            return;
        }

        let encoded = match encode(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                self.counters.populate_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key, error = %e, "Failed to encode suggestions for cache");
                return;
            }
        };

        let result = match tokio::time::timeout(
            budget,
            self.backend.set(key, &encoded, self.config.ttl),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(budget)),
        };

        if let Err(e) = result {
            self.counters.populate_failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                key,
                backend = self.backend.name(),
                error = %e,
                "Suggestion cache populate failed"
            );
        }
    }

    /// Per-call budget: the call timeout, cut short by the deadline
    fn call_budget(&self, deadline: Instant) -> Duration {
        self.config.call_timeout.min(remaining(deadline))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            backend: self.backend.name(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            degraded: self.counters.degraded.load(Ordering::Relaxed),
            corrupt: self.counters.corrupt.load(Ordering::Relaxed),
            populate_failures: self.counters.populate_failures.load(Ordering::Relaxed),
            populate_skipped: self.counters.populate_skipped.load(Ordering::Relaxed),
        }
    }
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

// ============================================================================
// TESTS
// ============================================================================
