//! Response bodies for the three search operations and health

use serde::Serialize;

use crate::cache::CacheStats;
use crate::model::{ResultCounts, SearchResult, SemanticResult, Suggestion, TypoCorrection};
use crate::query::QueryInfo;

/// Full search response
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub counts: ResultCounts,
    pub query: QueryInfo,
    pub took_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SearchMetadata>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Pagination and authorization details
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SearchMetadata {
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restricted_message: Option<String>,
}

/// Typeahead response
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SuggestResponse {
    pub suggestions: Vec<Suggestion>,
    /// "Did you mean" rewrites of the typed query
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub typo_corrections: Vec<TypoCorrection>,
    pub query: QueryInfo,
    pub took_ms: u64,
    pub cache_hit: bool,
}

/// Query echo for the semantic endpoint
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SemanticQueryInfo {
    pub original: String,
    pub embedding_dimensions: usize,
    pub similarity_threshold: f32,
}

/// Per-stage timings of a semantic request
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Performance {
    pub embedding_generation_ms: u64,
    pub vector_search_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_search_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_dedup_ms: Option<u64>,
}

/// Authorization details of a semantic request
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SemanticMetadata {
    pub restricted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restricted_message: Option<String>,
}

/// Semantic or hybrid response
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SemanticResponse {
    pub results: Vec<SemanticResult>,
    /// Present only in hybrid mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact_matches: Option<Vec<SemanticResult>>,
    pub query: SemanticQueryInfo,
    pub took_ms: u64,
    pub performance: Performance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SemanticMetadata>,
}

/// Health of one collaborator
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ComponentHealth {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Engine health
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HealthReport {
    /// `ok` when the store answers, otherwise `degraded`
    pub status: &'static str,
    pub version: &'static str,
    pub store: ComponentHealth,
    pub cache: CacheStats,
    pub embedding_model: String,
}
