//! Semantic search
//!
//! Embeds the query through the [`EmbeddingProvider`] and runs a
//! nearest-neighbour search over stored document embeddings. Query vectors
//! are kept in a small LRU so repeated queries skip the embedding call.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::embeddings::{EMBEDDING_DIMENSIONS, EmbeddingError, EmbeddingProvider};
use crate::model::{EntityType, MatchType, SemanticResult, compare_ranked};
use crate::storage::{SearchStore, StoreError, VectorQuery, with_timeout};

use super::snippet::{AnalyzedField, build_snippet, escape_html, preview};
use super::stem::stems;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Semantic search failure, split by which collaborator failed
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SemanticError {
    /// The embedding service could not produce a query vector
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
    /// The vector search itself failed
    #[error("Vector search failed: {0}")]
    VectorSearch(#[source] StoreError),
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for semantic search
#[derive(Debug, Clone)]
pub struct SemanticConfig {
    /// Required query vector width
    pub dimensions: usize,
    /// Embedding call timeout
    pub embedding_timeout: Duration,
    /// Vector search timeout
    pub store_timeout: Duration,
    /// Snippet length in characters
    pub snippet_chars: usize,
    /// Number of query vectors kept
    pub embedding_cache_size: usize,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            dimensions: EMBEDDING_DIMENSIONS,
            embedding_timeout: Duration::from_secs(1),
            store_timeout: Duration::from_millis(150),
            snippet_chars: 160,
            embedding_cache_size: 100,
        }
    }
}

/// Semantic hits plus per-stage timings
#[derive(Debug, Clone, Default)]
pub struct SemanticOutcome {
    pub results: Vec<SemanticResult>,
    pub embedding_generation_ms: u64,
    pub vector_search_ms: u64,
    /// The query vector came from the LRU
    pub embedding_cached: bool,
}

// ============================================================================
// EXECUTOR
// ============================================================================

/// Embedding similarity search over positions, documents and briefs
pub struct SemanticSearchExecutor {
    store: Arc<dyn SearchStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: SemanticConfig,
    query_cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl SemanticSearchExecutor {
    pub fn new(
        store: Arc<dyn SearchStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: SemanticConfig,
    ) -> Self {
        let capacity = NonZeroUsize::new(config.embedding_cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            store,
            embedder,
            config,
            query_cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn config(&self) -> &SemanticConfig {
        &self.config
    }

    /// Name of the embedding model in use
    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// Find documents of `entity_types` whose similarity to `query_text` is
    /// at least `threshold`, best first.
    ///
    /// `entity_types` must already be restricted to the semantic set.
    pub async fn search(
        &self,
        query_text: &str,
        entity_types: &[EntityType],
        threshold: f32,
        limit: usize,
    ) -> Result<SemanticOutcome, SemanticError> {
        let embed_start = Instant::now();
        let (embedding, embedding_cached) = self.query_embedding(query_text).await?;
        let embedding_generation_ms = embed_start.elapsed().as_millis() as u64;

        let search_start = Instant::now();
        let query = VectorQuery {
            embedding,
            entity_types: entity_types.to_vec(),
            threshold,
            limit,
        };
        let hits = with_timeout(self.config.store_timeout, self.store.nearest(&query))
            .await
            .map_err(SemanticError::VectorSearch)?;
        let vector_search_ms = search_start.elapsed().as_millis() as u64;

        let mut query_stems: Vec<Vec<String>> = Vec::new();
        for stem in stems(query_text) {
            let seq = vec![stem];
            if !query_stems.contains(&seq) {
                query_stems.push(seq);
            }
        }

        let mut results: Vec<SemanticResult> = hits
            .into_iter()
            .filter(|hit| hit.similarity >= threshold)
            .map(|hit| {
                let mut result =
                    SemanticResult::from_document(&hit.document, hit.similarity, MatchType::Semantic);
                result.snippet_en = self.snippet(&hit.document.body_en, &query_stems);
                result.snippet_ar = self.snippet(&hit.document.body_ar, &query_stems);
                result
            })
            .collect();
        results.sort_by(|a, b| {
            compare_ranked(
                (a.similarity_score, a.updated_at, a.id),
                (b.similarity_score, b.updated_at, b.id),
            )
        });
        results.truncate(limit);

        tracing::debug!(
            results = results.len(),
            embedding_cached,
            embedding_generation_ms,
            vector_search_ms,
            "Semantic search complete"
        );

        Ok(SemanticOutcome {
            results,
            embedding_generation_ms,
            vector_search_ms,
            embedding_cached,
        })
    }

    /// Query vector from the LRU or the embedding service
    async fn query_embedding(&self, text: &str) -> Result<(Vec<f32>, bool), EmbeddingError> {
        if let Ok(mut cache) = self.query_cache.lock() {
            if let Some(cached) = cache.get(text) {
                return Ok((cached.clone(), true));
            }
        }

        let timeout = self.config.embedding_timeout;
        let embedding = match tokio::time::timeout(timeout, self.embedder.embed(text)).await {
            Ok(result) => result?,
            Err(_) => return Err(EmbeddingError::Timeout(timeout)),
        };

        if embedding.len() != self.config.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.config.dimensions,
                actual: embedding.len(),
            });
        }

        if let Ok(mut cache) = self.query_cache.lock() {
            cache.put(text.to_string(), embedding.clone());
        }
        Ok((embedding, false))
    }

    /// Highlighted window around the first query word in `body`, or the
    /// escaped lead of `body` when no query word occurs in it
    fn snippet(&self, body: &str, query_stems: &[Vec<String>]) -> Option<String> {
        let field = AnalyzedField::new(body);
        let mask = field.highlight_mask(query_stems);
        build_snippet(&field, &mask, self.config.snippet_chars)
            .or_else(|| preview(body, self.config.snippet_chars).map(|text| escape_html(&text)))
    }
}

// ============================================================================
// TESTS
// ============================================================================
