//! Result types returned by the executors and the engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Document, EntityType, MatchType};

/// A keyword search hit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub id: Uuid,
    pub entity_type: EntityType,
    pub title_en: String,
    pub title_ar: String,
    /// Normalized relevance in [0, 1]
    pub rank_score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet_en: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet_ar: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub is_archived: bool,
    /// Used by the authorizer, never sent to clients
    #[serde(skip)]
    pub classification_level: u8,
}

impl SearchResult {
    pub fn from_document(
        doc: &Document,
        rank_score: f32,
        snippet_en: Option<String>,
        snippet_ar: Option<String>,
    ) -> Self {
        Self {
            id: doc.id,
            entity_type: doc.entity_type,
            title_en: doc.title_en.clone(),
            title_ar: doc.title_ar.clone(),
            rank_score: rank_score.clamp(0.0, 1.0),
            snippet_en,
            snippet_ar,
            updated_at: doc.updated_at,
            is_archived: doc.is_archived,
            classification_level: doc.classification_level,
        }
    }
}

/// A semantic-endpoint hit (semantic, exact or hybrid)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SemanticResult {
    pub id: Uuid,
    pub entity_type: EntityType,
    pub title_en: String,
    pub title_ar: String,
    /// Similarity in [0, 1]
    pub similarity_score: f32,
    pub match_type: MatchType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet_en: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet_ar: Option<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub classification_level: u8,
}

impl SemanticResult {
    pub fn from_document(doc: &Document, similarity_score: f32, match_type: MatchType) -> Self {
        Self {
            id: doc.id,
            entity_type: doc.entity_type,
            title_en: doc.title_en.clone(),
            title_ar: doc.title_ar.clone(),
            similarity_score: similarity_score.clamp(0.0, 1.0),
            match_type,
            snippet_en: None,
            snippet_ar: None,
            updated_at: doc.updated_at,
            classification_level: doc.classification_level,
        }
    }

    /// Convert a keyword hit into an exact match carrying `similarity_score`
    pub fn exact_from(result: &SearchResult, similarity_score: f32) -> Self {
        Self {
            id: result.id,
            entity_type: result.entity_type,
            title_en: result.title_en.clone(),
            title_ar: result.title_ar.clone(),
            similarity_score: similarity_score.clamp(0.0, 1.0),
            match_type: MatchType::Exact,
            snippet_en: result.snippet_en.clone(),
            snippet_ar: result.snippet_ar.clone(),
            updated_at: result.updated_at,
            classification_level: result.classification_level,
        }
    }
}

/// A typeahead suggestion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    pub id: Uuid,
    pub entity_type: EntityType,
    pub title_en: String,
    pub title_ar: String,
    /// Prefix-match quality in [0, 1]
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_ar: Option<String>,
    /// Character offset of the matched prefix inside the title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_position: Option<usize>,
    /// Set when the title matched the typed word only approximately
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typo_correction: Option<TypoCorrection>,
    /// Carried separately in cache entries, never sent to clients
    #[serde(skip)]
    pub classification_level: u8,
}

/// A "did you mean" rewrite of a typeahead query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TypoCorrection {
    pub original: String,
    pub corrected: String,
    /// Edit-distance similarity of the corrected word, in [0, 1)
    pub similarity_score: f32,
}

/// Per-request aggregate of matches by entity type
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultCounts {
    pub total: usize,
    pub dossiers: usize,
    pub people: usize,
    pub engagements: usize,
    pub positions: usize,
    pub mous: usize,
    pub documents: usize,
    /// Matches hidden from the caller by authorization
    pub restricted: usize,
}

impl ResultCounts {
    /// Count one match of the given type
    pub fn record(&mut self, entity_type: EntityType) {
        self.total += 1;
        match entity_type {
            EntityType::Dossier => self.dossiers += 1,
            EntityType::Person => self.people += 1,
            EntityType::Engagement => self.engagements += 1,
            EntityType::Position => self.positions += 1,
            EntityType::Mou => self.mous += 1,
            EntityType::Document => self.documents += 1,
            // Briefs only contribute to the total
            EntityType::Brief => {}
        }
    }

    /// Count for a single entity type
    pub fn for_type(&self, entity_type: EntityType) -> usize {
        match entity_type {
            EntityType::Dossier => self.dossiers,
            EntityType::Person => self.people,
            EntityType::Engagement => self.engagements,
            EntityType::Position => self.positions,
            EntityType::Mou => self.mous,
            EntityType::Document => self.documents,
            EntityType::Brief => 0,
        }
    }
}
