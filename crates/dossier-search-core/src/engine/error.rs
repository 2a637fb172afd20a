//! API-level error taxonomy
//!
//! Every error carries English and Arabic text. Validation errors are the
//! caller's fault and map to 400; unavailability maps to 503 and names the
//! collaborator that failed.

use serde::Serialize;

use crate::query::QueryError;
use crate::search::SemanticError;
use crate::storage::StoreError;

/// Which collaborator was unavailable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Store,
    Embedding,
    VectorSearch,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Store => "store",
            SourceKind::Embedding => "embedding",
            SourceKind::VectorSearch => "vector_search",
        }
    }
}

/// Search request failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum SearchError {
    /// Malformed or out-of-range input
    #[error("{message}")]
    Validation {
        message: String,
        message_ar: String,
        /// Offending character position for query syntax errors
        position: Option<usize>,
    },
    /// A backing collaborator is down or timed out
    #[error("{message}")]
    Unavailable {
        message: String,
        message_ar: String,
        source_kind: SourceKind,
    },
}

impl SearchError {
    pub fn validation(message: impl Into<String>, message_ar: impl Into<String>) -> Self {
        SearchError::Validation {
            message: message.into(),
            message_ar: message_ar.into(),
            position: None,
        }
    }

    pub fn unavailable(source_kind: SourceKind, detail: impl std::fmt::Display) -> Self {
        let (message, message_ar) = match source_kind {
            SourceKind::Store => (
                "Search is temporarily unavailable",
                "البحث غير متاح مؤقتاً",
            ),
            SourceKind::Embedding => (
                "Embedding service is temporarily unavailable",
                "خدمة التضمين غير متاحة مؤقتاً",
            ),
            SourceKind::VectorSearch => (
                "Semantic search is temporarily unavailable",
                "البحث الدلالي غير متاح مؤقتاً",
            ),
        };
        tracing::error!(source = source_kind.as_str(), error = %detail, "{}", message);
        SearchError::Unavailable {
            message: message.to_string(),
            message_ar: message_ar.to_string(),
            source_kind,
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            SearchError::Validation { .. } => "VALIDATION_ERROR",
            SearchError::Unavailable { source_kind, .. } => match source_kind {
                SourceKind::Store => "SEARCH_UNAVAILABLE",
                SourceKind::Embedding => "EMBEDDING_UNAVAILABLE",
                SourceKind::VectorSearch => "VECTOR_SEARCH_UNAVAILABLE",
            },
        }
    }

    /// HTTP status the error maps to
    pub fn status_code(&self) -> u16 {
        match self {
            SearchError::Validation { .. } => 400,
            SearchError::Unavailable { .. } => 503,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            SearchError::Validation { message, .. } | SearchError::Unavailable { message, .. } => {
                message
            }
        }
    }

    pub fn message_ar(&self) -> &str {
        match self {
            SearchError::Validation { message_ar, .. }
            | SearchError::Unavailable { message_ar, .. } => message_ar,
        }
    }
}

impl From<QueryError> for SearchError {
    fn from(e: QueryError) -> Self {
        let position = match &e {
            QueryError::Syntax { position, .. } => Some(*position),
            _ => None,
        };
        SearchError::Validation {
            message: e.to_string(),
            message_ar: e.message_ar(),
            position,
        }
    }
}

impl From<StoreError> for SearchError {
    fn from(e: StoreError) -> Self {
        SearchError::unavailable(SourceKind::Store, e)
    }
}

impl From<SemanticError> for SearchError {
    fn from(e: SemanticError) -> Self {
        match e {
            SemanticError::Embedding(inner) => SearchError::unavailable(SourceKind::Embedding, inner),
            SemanticError::VectorSearch(inner) => {
                SearchError::unavailable(SourceKind::VectorSearch, inner)
            }
        }
    }
}
