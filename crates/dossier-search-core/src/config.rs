//! Engine configuration.
//!
//! # Example
//!
//! ```
//! use dossier_search_core::SearchConfig;
//!
//! let config = SearchConfig::default();
//! assert_eq!(config.suggest_max_query_len, 100);
//!
//! let config = SearchConfig {
//!     suggestion_ttl_secs: 60,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "DOSSIER_SEARCH_";

/// Hard latency budget of the suggest endpoint
pub const SUGGEST_SLA: Duration = Duration::from_millis(200);

/// Invalid configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid configuration for {field}: {message}")]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

/// Engine configuration. Every field has a default.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Full search query length limit (characters)
    pub max_query_len: usize,
    /// Cut over-length full search queries instead of rejecting them
    pub truncate_long_queries: bool,
    /// Suggest query length limit; always enforced by rejection
    pub suggest_max_query_len: usize,
    /// Semantic query length bounds
    pub semantic_min_query_len: usize,
    pub semantic_max_query_len: usize,

    pub search_default_limit: usize,
    pub search_max_limit: usize,
    pub suggest_default_limit: usize,
    pub suggest_max_limit: usize,
    pub semantic_default_limit: usize,
    pub semantic_max_limit: usize,

    pub default_similarity_threshold: f32,
    pub embedding_dimensions: usize,

    /// Per-call timeouts
    pub store_timeout_ms: u64,
    pub embedding_timeout_ms: u64,
    pub cache_timeout_ms: u64,
    /// Internal deadline for the whole suggest path, under the 200ms SLA
    pub suggest_deadline_ms: u64,

    pub suggestion_ttl_secs: u64,
    /// Row cap of the prefix lookup
    pub suggestion_row_cap: usize,
    /// Minimum similarity of a typeahead typo correction
    pub typo_min_similarity: f32,
    /// Entries kept by the in-process suggestion cache
    pub memory_cache_capacity: usize,

    /// Candidates fetched per lexical query
    pub raw_result_cap: usize,
    /// Snippet window (characters)
    pub snippet_window: usize,
    /// Query vectors kept by the semantic executor
    pub embedding_cache_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_query_len: 500,
            truncate_long_queries: true,
            suggest_max_query_len: 100,
            semantic_min_query_len: 3,
            semantic_max_query_len: 500,
            search_default_limit: 20,
            search_max_limit: 100,
            suggest_default_limit: 10,
            suggest_max_limit: 20,
            semantic_default_limit: 20,
            semantic_max_limit: 100,
            default_similarity_threshold: 0.6,
            embedding_dimensions: crate::embeddings::EMBEDDING_DIMENSIONS,
            store_timeout_ms: 150,
            embedding_timeout_ms: 1000,
            cache_timeout_ms: 50,
            suggest_deadline_ms: 190,
            suggestion_ttl_secs: 300,
            suggestion_row_cap: 20,
            typo_min_similarity: 0.75,
            memory_cache_capacity: 10_000,
            raw_result_cap: 1000,
            snippet_window: 160,
            embedding_cache_size: 100,
        }
    }
}

impl SearchConfig {
    /// Defaults overridden by `DOSSIER_SEARCH_*` environment variables.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with an explicit variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let env = Env { lookup: &lookup };

        env.apply("MAX_QUERY_LEN", &mut config.max_query_len);
        env.apply("TRUNCATE_LONG_QUERIES", &mut config.truncate_long_queries);
        env.apply("SUGGEST_MAX_QUERY_LEN", &mut config.suggest_max_query_len);
        env.apply("SEMANTIC_MIN_QUERY_LEN", &mut config.semantic_min_query_len);
        env.apply("SEMANTIC_MAX_QUERY_LEN", &mut config.semantic_max_query_len);
        env.apply("SEARCH_DEFAULT_LIMIT", &mut config.search_default_limit);
        env.apply("SEARCH_MAX_LIMIT", &mut config.search_max_limit);
        env.apply("SUGGEST_DEFAULT_LIMIT", &mut config.suggest_default_limit);
        env.apply("SUGGEST_MAX_LIMIT", &mut config.suggest_max_limit);
        env.apply("SEMANTIC_DEFAULT_LIMIT", &mut config.semantic_default_limit);
        env.apply("SEMANTIC_MAX_LIMIT", &mut config.semantic_max_limit);
        env.apply("SIMILARITY_THRESHOLD", &mut config.default_similarity_threshold);
        env.apply("EMBEDDING_DIMENSIONS", &mut config.embedding_dimensions);
        env.apply("STORE_TIMEOUT_MS", &mut config.store_timeout_ms);
        env.apply("EMBEDDING_TIMEOUT_MS", &mut config.embedding_timeout_ms);
        env.apply("CACHE_TIMEOUT_MS", &mut config.cache_timeout_ms);
        env.apply("SUGGEST_DEADLINE_MS", &mut config.suggest_deadline_ms);
        env.apply("CACHE_TTL_SECS", &mut config.suggestion_ttl_secs);
        env.apply("SUGGESTION_ROW_CAP", &mut config.suggestion_row_cap);
        env.apply("TYPO_MIN_SIMILARITY", &mut config.typo_min_similarity);
        env.apply("MEMORY_CACHE_CAPACITY", &mut config.memory_cache_capacity);
        env.apply("RAW_RESULT_CAP", &mut config.raw_result_cap);
        env.apply("SNIPPET_WINDOW", &mut config.snippet_window);
        env.apply("EMBEDDING_CACHE_SIZE", &mut config.embedding_cache_size);

        config
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if Duration::from_millis(self.suggest_deadline_ms) >= SUGGEST_SLA {
            return Err(ConfigError {
                field: "suggest_deadline_ms",
                message: format!("must be below {}ms", SUGGEST_SLA.as_millis()),
            });
        }
        if self.cache_timeout_ms >= self.suggest_deadline_ms {
            return Err(ConfigError {
                field: "cache_timeout_ms",
                message: "must be below suggest_deadline_ms".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.default_similarity_threshold) {
            return Err(ConfigError {
                field: "default_similarity_threshold",
                message: "must be within [0, 1]".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.typo_min_similarity) {
            return Err(ConfigError {
                field: "typo_min_similarity",
                message: "must be within [0, 1]".to_string(),
            });
        }
        if self.semantic_min_query_len > self.semantic_max_query_len {
            return Err(ConfigError {
                field: "semantic_min_query_len",
                message: "must not exceed semantic_max_query_len".to_string(),
            });
        }
        for (field, default, max) in [
            ("search_default_limit", self.search_default_limit, self.search_max_limit),
            ("suggest_default_limit", self.suggest_default_limit, self.suggest_max_limit),
            ("semantic_default_limit", self.semantic_default_limit, self.semantic_max_limit),
        ] {
            if default == 0 || default > max {
                return Err(ConfigError {
                    field,
                    message: format!("must be within 1..={}", max),
                });
            }
        }
        if self.embedding_dimensions == 0 {
            return Err(ConfigError {
                field: "embedding_dimensions",
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_millis(self.embedding_timeout_ms)
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }

    pub fn suggest_deadline(&self) -> Duration {
        Duration::from_millis(self.suggest_deadline_ms)
    }

    pub fn suggestion_ttl(&self) -> Duration {
        Duration::from_secs(self.suggestion_ttl_secs)
    }
}

struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Env<'_> {
    fn apply<T: FromStr>(&self, suffix: &str, target: &mut T) {
        let name = format!("{}{}", ENV_PREFIX, suffix);
        let Some(raw) = (self.lookup)(&name) else {
            return;
        };
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => tracing::warn!(variable = %name, value = %raw, "Ignoring unparseable setting"),
        }
    }
}
