//! Storage Module
//!
//! The searchable store behind the executors:
//! - [`SearchStore`]: the async seam the engine searches through
//! - [`SqliteStore`]: SQLite backend with an FTS5 term index and embedded vectors
//! - Schema migrations

mod migrations;
mod sqlite;

pub use migrations::{MIGRATIONS, Migration};
pub use sqlite::SqliteStore;

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::model::{Document, EntityType};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Searchable store error
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Store cannot serve requests
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    /// Call exceeded its time budget
    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Stored value could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
}

/// Store result type
pub type Result<T> = std::result::Result<T, StoreError>;

/// Run a store call under a timeout
pub async fn with_timeout<T, F>(timeout: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(timeout)),
    }
}

// ============================================================================
// QUERIES
// ============================================================================

/// Condition on indexed stems that every candidate must satisfy
#[derive(Debug, Clone, PartialEq)]
pub enum StemClause {
    /// Every stem occurs somewhere in the document
    All(Vec<String>),
    And(Box<StemClause>, Box<StemClause>),
    Or(Box<StemClause>, Box<StemClause>),
}

impl StemClause {
    pub fn and(left: StemClause, right: StemClause) -> Self {
        StemClause::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: StemClause, right: StemClause) -> Self {
        StemClause::Or(Box::new(left), Box::new(right))
    }

    /// Every stem named anywhere in the clause
    pub fn stems(&self) -> Vec<&str> {
        match self {
            StemClause::All(stems) => stems.iter().map(String::as_str).collect(),
            StemClause::And(l, r) | StemClause::Or(l, r) => {
                let mut out = l.stems();
                out.extend(r.stems());
                out
            }
        }
    }
}

/// One page of candidate retrieval for keyword search
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentQuery {
    pub entity_types: Vec<EntityType>,
    /// `None` means every document of the requested types
    pub clause: Option<StemClause>,
    pub include_archived: bool,
    /// Page size
    pub limit: usize,
    pub offset: usize,
}

/// Title prefix lookup for typeahead
#[derive(Debug, Clone, PartialEq)]
pub struct PrefixQuery {
    pub entity_types: Vec<EntityType>,
    /// Completed words that must all appear in the title
    pub words: Vec<String>,
    /// Trailing partial word
    pub prefix: String,
    /// Hard row cap
    pub limit: usize,
}

/// Nearest-neighbour search over stored embeddings
#[derive(Debug, Clone, PartialEq)]
pub struct VectorQuery {
    pub embedding: Vec<f32>,
    pub entity_types: Vec<EntityType>,
    /// Minimum cosine similarity
    pub threshold: f32,
    pub limit: usize,
}

/// A vector search hit
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub document: Document,
    pub similarity: f32,
}

/// Store statistics
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct StoreStats {
    pub documents: usize,
    pub archived: usize,
    pub embeddings: usize,
    pub by_type: BTreeMap<EntityType, usize>,
}

// ============================================================================
// SEARCH STORE
// ============================================================================

/// The searchable store, as seen by the executors
#[async_trait]
pub trait SearchStore: Send + Sync {
    /// One page of documents satisfying the stem clause.
    ///
    /// Best term-index score first when there is a clause, newest first
    /// otherwise. Order is stable across pages of the same query.
    async fn candidates(&self, query: &DocumentQuery) -> Result<Vec<Document>>;

    /// Non-archived documents whose title starts a word with the prefix
    async fn prefix_lookup(&self, query: &PrefixQuery) -> Result<Vec<Document>>;

    /// Most similar documents at or above the threshold, best first
    async fn nearest(&self, query: &VectorQuery) -> Result<Vec<VectorHit>>;

    /// Health check
    async fn ping(&self) -> Result<()>;
}
