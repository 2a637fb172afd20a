//! # Dossier Search Core
//!
//! Bilingual (English/Arabic) search engine over dossiers, people,
//! engagements, positions, MoUs, documents and briefs:
//!
//! - **Boolean keyword search**: `AND`/`OR`/`NOT`, parentheses and quoted
//!   phrases, light English and Arabic stemming, title-weighted ranking and
//!   highlighted snippets
//! - **Typeahead**: title prefix lookup behind a read-through cache with a
//!   hard sub-200ms budget and automatic fallback when the cache is down
//! - **Semantic search**: embedding similarity over positions, documents and
//!   briefs, optionally merged with keyword matches into disjoint score bands
//! - **Authorization**: results filtered through an injected visibility
//!   policy, with hidden matches counted
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dossier_search_core::{Caller, SearchEngine, SearchParams, SqliteStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SqliteStore::new(None)?);
//! let engine = SearchEngine::builder(store).build()?;
//!
//! let response = engine
//!     .search(&Caller::anonymous(0), &SearchParams::new("climate AND (policy OR treaty)"))
//!     .await?;
//! for result in &response.results {
//!     println!("{} {:.2}", result.title_en, result.rank_score);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `redis-cache` (default): Redis backend for the suggestion cache
//! - `remote-embeddings` (default): HTTP client for the embedding service

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod auth;
pub mod cache;
pub mod config;
pub mod embeddings;
pub mod engine;
pub mod model;
pub mod query;
pub mod search;
pub mod storage;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use model::{
    Document, EntityType, Language, MatchType, ResultCounts, SearchResult, SemanticResult,
    Suggestion, TypoCorrection,
};

pub use query::{BooleanExpr, LengthPolicy, Query, QueryError, QueryInfo};

pub use storage::{SearchStore, SqliteStore, StoreError, StoreStats};

pub use embeddings::{EMBEDDING_DIMENSIONS, EmbeddingError, EmbeddingProvider, HashEmbedder};

#[cfg(feature = "remote-embeddings")]
pub use embeddings::HttpEmbeddingClient;

pub use search::{
    HybridMerge, LexicalSearchExecutor, SemanticError, SemanticSearchExecutor,
};

pub use cache::{CacheBackend, CacheError, CacheStats, MemoryCacheBackend, SuggestionCache};

#[cfg(feature = "redis-cache")]
pub use cache::RedisCacheBackend;

pub use auth::{AllowAll, Caller, Classified, ClearanceAuthorizer, ResultAuthorizer};

pub use config::{ConfigError, SearchConfig};

pub use engine::{
    HealthReport, LangPreference, SearchEngine, SearchError, SearchParams, SearchResponse,
    SemanticParams, SemanticResponse, SourceKind, SuggestParams, SuggestResponse,
};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
