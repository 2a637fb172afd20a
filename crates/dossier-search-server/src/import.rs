//! JSONL document import
//!
//! One JSON object per line:
//!
//! ```json
//! {"entity_type": "positions", "title_en": "...", "title_ar": "...", "body_en": "...", "embedding": [...]}
//! ```
//!
//! `id` and `updated_at` default to a fresh UUID and the import time.
//! Positions, documents and briefs without an `embedding` get a hash
//! embedding so they are reachable through semantic search.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{DateTime, Utc};
use dossier_search_core::embeddings::fit_dimensions;
use dossier_search_core::{
    Document, EMBEDDING_DIMENSIONS, EmbeddingProvider, EntityType, HashEmbedder, SqliteStore,
    StoreError,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// Model label stored with embeddings supplied in the import file
pub const SUPPLIED_MODEL: &str = "supplied";

/// Import failure
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Line {line}: {message}")]
    InvalidRecord { line: usize, message: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One line of an import file
#[derive(Debug, Clone, Deserialize)]
pub struct ImportRecord {
    pub id: Option<Uuid>,
    /// Singular or plural type name
    pub entity_type: String,
    #[serde(default)]
    pub title_en: String,
    #[serde(default)]
    pub title_ar: String,
    #[serde(default)]
    pub body_en: String,
    #[serde(default)]
    pub body_ar: String,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub classification_level: u8,
    pub embedding: Option<Vec<f32>>,
}

impl ImportRecord {
    fn into_document(self) -> Result<(Document, Option<Vec<f32>>), String> {
        let entity_type = self.entity_type.parse::<EntityType>()?;
        if self.title_en.trim().is_empty() && self.title_ar.trim().is_empty() {
            return Err("record has neither title_en nor title_ar".to_string());
        }

        let document = Document {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            entity_type,
            title_en: self.title_en,
            title_ar: self.title_ar,
            body_en: self.body_en,
            body_ar: self.body_ar,
            updated_at: self.updated_at.unwrap_or_else(Utc::now),
            is_archived: self.is_archived,
            classification_level: self.classification_level,
        };
        Ok((document, self.embedding))
    }
}

/// What an import wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub documents: usize,
    /// Embeddings taken from the file
    pub supplied_embeddings: usize,
    /// Embeddings computed with the hash embedder
    pub generated_embeddings: usize,
    /// Lines skipped as invalid (lenient mode only)
    pub skipped: usize,
}

/// Loads documents and their embeddings into a [`SqliteStore`]
pub struct Importer<'a> {
    store: &'a SqliteStore,
    embedder: HashEmbedder,
    dimensions: usize,
    strict: bool,
}

impl<'a> Importer<'a> {
    pub fn new(store: &'a SqliteStore) -> Self {
        Self {
            store,
            embedder: HashEmbedder::new(EMBEDDING_DIMENSIONS),
            dimensions: EMBEDDING_DIMENSIONS,
            strict: false,
        }
    }

    /// Builder: vector width for generated and supplied embeddings
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self.embedder = HashEmbedder::new(dimensions);
        self
    }

    /// Builder: fail on the first invalid line instead of skipping it
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn import_file(&self, path: &Path) -> Result<ImportSummary, ImportError> {
        let file = File::open(path)?;
        self.import_reader(BufReader::new(file))
    }

    pub fn import_reader(&self, reader: impl BufRead) -> Result<ImportSummary, ImportError> {
        let mut summary = ImportSummary::default();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = index + 1;
            if line.trim().is_empty() {
                continue;
            }

            let parsed = serde_json::from_str::<ImportRecord>(&line)
                .map_err(|e| e.to_string())
                .and_then(ImportRecord::into_document);

            match parsed {
                Ok((document, embedding)) => self.import_document(&document, embedding, &mut summary)?,
                Err(message) if self.strict => {
                    return Err(ImportError::InvalidRecord {
                        line: line_no,
                        message,
                    });
                }
                Err(message) => {
                    warn!(line = line_no, error = %message, "Skipping invalid import record");
                    summary.skipped += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Upsert one document, attaching an embedding when its type is searchable semantically
    pub fn import_document(
        &self,
        document: &Document,
        embedding: Option<Vec<f32>>,
        summary: &mut ImportSummary,
    ) -> Result<(), ImportError> {
        self.store.upsert_document(document)?;
        summary.documents += 1;

        if !document.entity_type.is_semantic() {
            if embedding.is_some() {
                debug!(id = %document.id, entity_type = %document.entity_type.as_str(), "Ignoring embedding for non-semantic type");
            }
            return Ok(());
        }

        match embedding {
            Some(vector) => {
                let vector = fit_dimensions(vector, self.dimensions);
                self.store.upsert_embedding(document.id, &vector, SUPPLIED_MODEL)?;
                summary.supplied_embeddings += 1;
            }
            None => {
                let text = format!(
                    "{} {} {} {}",
                    document.title_en, document.title_ar, document.body_en, document.body_ar
                );
                let vector = self.embedder.embed_text(&text);
                self.store
                    .upsert_embedding(document.id, &vector, self.embedder.model_name())?;
                summary.generated_embeddings += 1;
            }
        }
        Ok(())
    }
}
