//! Cache Module
//!
//! Typeahead responses are the only cached values:
//! - [`CacheBackend`]: the key/value seam with per-entry TTL
//! - [`MemoryCacheBackend`]: in-process LRU with expiry
//! - [`RedisCacheBackend`]: shared Redis store (feature `redis-cache`)
//! - [`SuggestionCache`]: read-through decorator with a hard latency budget

mod memory;
#[cfg(feature = "redis-cache")]
mod redis;
mod suggestion;

pub use memory::MemoryCacheBackend;
#[cfg(feature = "redis-cache")]
pub use self::redis::RedisCacheBackend;
pub use suggestion::{
    CacheLookup, CacheStats, SuggestionCache, SuggestionCacheConfig, suggestion_key,
};

use std::time::Duration;

use async_trait::async_trait;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Cache backend error
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CacheError {
    /// Backend unreachable
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
    /// Call exceeded its time budget
    #[error("Cache call timed out after {0:?}")]
    Timeout(Duration),
    /// Backend rejected the command
    #[error("Cache backend error: {0}")]
    Backend(String),
    /// Entry could not be encoded or decoded
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ============================================================================
// BACKEND
// ============================================================================

/// String key/value store with per-entry TTL.
///
/// Writes are last-write-wins per key; implementations handle their own
/// concurrency.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Short backend name for logs and health output
    fn name(&self) -> &'static str;
}
