//! Model module - Core value types
//!
//! Every type here is an immutable, request-scoped value:
//! - Entity types and query languages
//! - Lexical, semantic and suggestion results
//! - Per-request result counts
//! - Stored documents (the searchable store's unit)

mod document;
mod result;

pub use document::Document;
pub use result::{ResultCounts, SearchResult, SemanticResult, Suggestion, TypoCorrection};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

// ============================================================================
// ENTITY TYPES
// ============================================================================

/// Searchable entity type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Dossier,
    Person,
    Engagement,
    Position,
    Mou,
    Document,
    /// AI-generated briefs, reachable through semantic/hybrid search only
    Brief,
}

impl EntityType {
    /// Entity types served by full keyword search
    pub const FULL_SEARCH: [EntityType; 6] = [
        EntityType::Dossier,
        EntityType::Person,
        EntityType::Engagement,
        EntityType::Position,
        EntityType::Mou,
        EntityType::Document,
    ];

    /// Entity types carrying embeddings (semantic and hybrid search)
    pub const SEMANTIC: [EntityType; 3] =
        [EntityType::Position, EntityType::Document, EntityType::Brief];

    /// Singular wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Dossier => "dossier",
            EntityType::Person => "person",
            EntityType::Engagement => "engagement",
            EntityType::Position => "position",
            EntityType::Mou => "mou",
            EntityType::Document => "document",
            EntityType::Brief => "brief",
        }
    }

    /// Plural name, as used by the semantic endpoint and result counts
    pub fn plural(&self) -> &'static str {
        match self {
            EntityType::Dossier => "dossiers",
            EntityType::Person => "people",
            EntityType::Engagement => "engagements",
            EntityType::Position => "positions",
            EntityType::Mou => "mous",
            EntityType::Document => "documents",
            EntityType::Brief => "briefs",
        }
    }

    pub fn is_semantic(&self) -> bool {
        Self::SEMANTIC.contains(self)
    }

    pub fn is_full_search(&self) -> bool {
        Self::FULL_SEARCH.contains(self)
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dossier" | "dossiers" => Ok(EntityType::Dossier),
            "person" | "persons" | "people" => Ok(EntityType::Person),
            "engagement" | "engagements" => Ok(EntityType::Engagement),
            "position" | "positions" => Ok(EntityType::Position),
            "mou" | "mous" => Ok(EntityType::Mou),
            "document" | "documents" => Ok(EntityType::Document),
            "brief" | "briefs" => Ok(EntityType::Brief),
            _ => Err(format!("Unknown entity type: {}", s)),
        }
    }
}

// ============================================================================
// LANGUAGE
// ============================================================================

/// Detected (or requested) query language
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Ar,
    #[default]
    Unknown,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ar => "ar",
            Language::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// MATCH TYPE
// ============================================================================

/// How a semantic-endpoint result was found
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Keyword match
    Exact,
    /// Embedding similarity only
    Semantic,
    /// Keyword match that the vector search also returned
    Hybrid,
}

// ============================================================================
// ORDERING
// ============================================================================

/// Total order for ranked results: score descending, then `updated_at`
/// descending, then `id` ascending.
pub(crate) fn compare_ranked(
    (a_score, a_updated, a_id): (f32, DateTime<Utc>, Uuid),
    (b_score, b_updated, b_id): (f32, DateTime<Utc>, Uuid),
) -> Ordering {
    b_score
        .total_cmp(&a_score)
        .then_with(|| b_updated.cmp(&a_updated))
        .then_with(|| a_id.cmp(&b_id))
}
