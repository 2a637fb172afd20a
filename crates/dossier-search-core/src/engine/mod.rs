//! Search Engine
//!
//! Orchestrates the three operations over the executors:
//!
//! ```text
//! PARSE → VALIDATE_PARAMS → {LEXICAL | SEMANTIC | HYBRID} → AUTHORIZE → ASSEMBLE
//! ```
//!
//! Parse and validation failures return [`SearchError::Validation`] before any
//! backend is called. Backend failures return [`SearchError::Unavailable`] and
//! are never retried here.

mod error;
mod params;
mod response;

pub use error::{SearchError, SourceKind};
pub use params::{
    LangPreference, SearchParams, SemanticParams, SuggestParams, parse_entity_types,
};
pub use response::{
    ComponentHealth, HealthReport, Performance, SearchMetadata, SearchResponse,
    SemanticMetadata, SemanticQueryInfo, SemanticResponse, SuggestResponse,
};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::auth::{AllowAll, Caller, ResultAuthorizer, filter_visible};
use crate::cache::{
    CacheBackend, CacheStats, MemoryCacheBackend, SuggestionCache, SuggestionCacheConfig,
    suggestion_key,
};
use crate::config::{ConfigError, SearchConfig};
use crate::embeddings::{EmbeddingProvider, HashEmbedder};
use crate::model::{Suggestion, TypoCorrection};
use crate::query::{BooleanExpr, LengthPolicy, Query, parse_expression, parse_plain};
use crate::search::{
    LexicalConfig, LexicalSearchExecutor, SemanticConfig, SemanticSearchExecutor, merge,
};
use crate::storage::{SearchStore, StoreError, with_timeout};

use params::{clamp_limit, full_search_types, semantic_query, semantic_types, similarity_threshold};

const MAX_TYPO_CORRECTIONS: usize = 3;

const DEFAULT_RESTRICTION_MESSAGE: &str = "Some results are hidden because of access restrictions. / بعض النتائج مخفية بسبب قيود الوصول.";

// ============================================================================
// BUILDER
// ============================================================================

/// Builder for [`SearchEngine`]
pub struct SearchEngineBuilder {
    store: Arc<dyn SearchStore>,
    config: SearchConfig,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    cache_backend: Option<Arc<dyn CacheBackend>>,
    authorizer: Option<Arc<dyn ResultAuthorizer>>,
}

impl SearchEngineBuilder {
    pub fn config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn cache_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.cache_backend = Some(backend);
        self
    }

    pub fn authorizer(mut self, authorizer: Arc<dyn ResultAuthorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    /// Validate the configuration and assemble the engine.
    ///
    /// Missing collaborators default to hash embeddings, an in-process cache
    /// and [`AllowAll`].
    pub fn build(self) -> Result<SearchEngine, ConfigError> {
        let config = self.config;
        config.validate()?;

        let embedder: Arc<dyn EmbeddingProvider> = match self.embedder {
            Some(embedder) => embedder,
            None => {
                tracing::warn!("No embedding service configured, using hash embeddings");
                Arc::new(HashEmbedder::new(config.embedding_dimensions))
            }
        };
        if embedder.dimensions() != config.embedding_dimensions {
            return Err(ConfigError {
                field: "embedding_dimensions",
                message: format!(
                    "embedder '{}' produces {} dimensions, expected {}",
                    embedder.model_name(),
                    embedder.dimensions(),
                    config.embedding_dimensions
                ),
            });
        }

        let cache_backend = self
            .cache_backend
            .unwrap_or_else(|| Arc::new(MemoryCacheBackend::new(config.memory_cache_capacity)));

        let lexical = LexicalSearchExecutor::new(
            self.store.clone(),
            LexicalConfig {
                snippet_window: config.snippet_window,
                raw_result_cap: config.raw_result_cap,
                store_timeout: config.store_timeout(),
                typo_min_similarity: config.typo_min_similarity,
                ..Default::default()
            },
        );
        let semantic = SemanticSearchExecutor::new(
            self.store.clone(),
            embedder,
            SemanticConfig {
                dimensions: config.embedding_dimensions,
                embedding_timeout: config.embedding_timeout(),
                store_timeout: config.store_timeout(),
                snippet_chars: config.snippet_window,
                embedding_cache_size: config.embedding_cache_size,
            },
        );
        let cache = SuggestionCache::new(
            cache_backend,
            SuggestionCacheConfig {
                ttl: config.suggestion_ttl(),
                call_timeout: config.cache_timeout(),
                deadline: config.suggest_deadline(),
            },
        );

        Ok(SearchEngine {
            store: self.store,
            lexical,
            semantic,
            cache,
            authorizer: self.authorizer.unwrap_or_else(|| Arc::new(AllowAll)),
            config,
        })
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// The search engine behind the HTTP surface
pub struct SearchEngine {
    store: Arc<dyn SearchStore>,
    lexical: LexicalSearchExecutor,
    semantic: SemanticSearchExecutor,
    cache: SuggestionCache,
    authorizer: Arc<dyn ResultAuthorizer>,
    config: SearchConfig,
}

impl SearchEngine {
    pub fn builder(store: Arc<dyn SearchStore>) -> SearchEngineBuilder {
        SearchEngineBuilder {
            store,
            config: SearchConfig::default(),
            embedder: None,
            cache_backend: None,
            authorizer: None,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // ========================================================================
    // FULL SEARCH
    // ========================================================================

    /// Boolean keyword search across the full-search entity types
    pub async fn search(
        &self,
        caller: &Caller,
        params: &SearchParams,
    ) -> Result<SearchResponse, SearchError> {
        let start = Instant::now();

        let policy = if self.config.truncate_long_queries {
            LengthPolicy::Truncate
        } else {
            LengthPolicy::Reject
        };
        let query = Query::parse_with_policy(&params.q, self.config.max_query_len, policy)?;
        let entity_types = full_search_types(params.entity_types.as_deref())?;
        let limit = clamp_limit(
            params.limit,
            self.config.search_default_limit,
            self.config.search_max_limit,
        );
        let offset = params.offset.unwrap_or(0);

        // Every match is authorized so pagination runs over visible results
        let page = self
            .lexical
            .search(
                &query.expression,
                &entity_types,
                self.config.raw_result_cap,
                0,
                params.include_archived,
            )
            .await?;

        let (visible, restricted) = filter_visible(self.authorizer.as_ref(), caller, page.results);
        let mut counts = page.counts;
        counts.restricted = restricted;

        let visible_total = visible.len();
        let results: Vec<_> = visible.into_iter().skip(offset).take(limit).collect();
        let has_more = offset + results.len() < visible_total;

        let mut warnings = Vec::new();
        if query.truncated {
            warnings.push(format!(
                "Query truncated to {} characters",
                self.config.max_query_len
            ));
        }
        if page.capped {
            warnings.push(format!(
                "Only the first {} matches were considered",
                self.config.raw_result_cap
            ));
        }

        let took_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            took_ms,
            total = counts.total,
            restricted,
            returned = results.len(),
            "Search complete"
        );

        Ok(SearchResponse {
            metadata: Some(SearchMetadata {
                has_more,
                next_offset: has_more.then_some(offset + results.len()),
                restricted_message: self.restriction_message(caller, restricted),
            }),
            results,
            counts,
            query: query.info(),
            took_ms,
            warnings,
        })
    }

    // ========================================================================
    // TYPEAHEAD
    // ========================================================================

    /// Title prefix suggestions through the suggestion cache
    pub async fn suggest(
        &self,
        caller: &Caller,
        params: &SuggestParams,
    ) -> Result<SuggestResponse, SearchError> {
        let start = Instant::now();

        let query = Query::parse_prefix(&params.q, self.config.suggest_max_query_len)?;
        let entity_types = full_search_types(params.entity_types.as_deref())?;
        let limit = clamp_limit(
            params.limit,
            self.config.suggest_default_limit,
            self.config.suggest_max_limit,
        );
        let language = params.lang.resolve(query.language);

        let key = suggestion_key(&query.normalized, &entity_types, language);
        let row_cap = self.config.suggestion_row_cap.max(limit);
        let store_timeout = self.config.store_timeout();

        let lookup = self
            .cache
            .get_or_compute(&key, |budget| {
                self.lexical.suggest(
                    &query,
                    &entity_types,
                    language,
                    row_cap,
                    budget.min(store_timeout),
                )
            })
            .await?;

        let (mut suggestions, restricted) =
            filter_visible(self.authorizer.as_ref(), caller, lookup.value);
        suggestions.truncate(limit);
        let typo_corrections = typo_corrections(&suggestions);

        let took_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            took_ms,
            cache_hit = lookup.cache_hit,
            returned = suggestions.len(),
            restricted,
            "Suggest complete"
        );

        Ok(SuggestResponse {
            suggestions,
            typo_corrections,
            query: query.info(),
            took_ms,
            cache_hit: lookup.cache_hit,
        })
    }

    // ========================================================================
    // SEMANTIC / HYBRID
    // ========================================================================

    /// Semantic search, merged with keyword matches when requested
    pub async fn semantic_search(
        &self,
        caller: &Caller,
        params: &SemanticParams,
    ) -> Result<SemanticResponse, SearchError> {
        let start = Instant::now();

        let text = semantic_query(
            &params.query,
            self.config.semantic_min_query_len,
            self.config.semantic_max_query_len,
        )?;
        let entity_types = semantic_types(params.entity_types.as_deref())?;
        let threshold = similarity_threshold(
            params.similarity_threshold,
            self.config.default_similarity_threshold,
        )?;
        let limit = clamp_limit(
            params.limit,
            self.config.semantic_default_limit,
            self.config.semantic_max_limit,
        );

        let query_info = SemanticQueryInfo {
            original: text.clone(),
            embedding_dimensions: self.config.embedding_dimensions,
            similarity_threshold: threshold,
        };

        if !params.include_keyword_results {
            let outcome = self
                .semantic
                .search(&text, &entity_types, threshold, limit)
                .await?;
            let (results, restricted) =
                filter_visible(self.authorizer.as_ref(), caller, outcome.results);

            let took_ms = start.elapsed().as_millis() as u64;
            tracing::debug!(took_ms, returned = results.len(), restricted, "Semantic search complete");

            return Ok(SemanticResponse {
                results,
                exact_matches: None,
                query: query_info,
                took_ms,
                performance: Performance {
                    embedding_generation_ms: outcome.embedding_generation_ms,
                    vector_search_ms: outcome.vector_search_ms,
                    keyword_search_ms: None,
                    merge_dedup_ms: None,
                },
                metadata: self.semantic_metadata(caller, restricted),
            });
        }

        // Keyword and semantic legs run concurrently
        let keyword_expr = keyword_expression(&text);
        let keyword = async {
            let started = Instant::now();
            let Some(expr) = keyword_expr.as_ref() else {
                return Ok::<_, StoreError>((Vec::new(), 0));
            };
            // Authorization runs before the cut to `limit`
            let page = self
                .lexical
                .search(expr, &entity_types, self.config.raw_result_cap, 0, false)
                .await?;
            Ok((page.results, started.elapsed().as_millis() as u64))
        };
        let (semantic, keyword) = tokio::join!(
            self.semantic.search(&text, &entity_types, threshold, limit),
            keyword
        );
        let outcome = semantic?;
        let (exact, keyword_search_ms) = keyword?;

        let authorizer = self.authorizer.as_ref();
        let (exact, hidden_exact): (Vec<_>, Vec<_>) = exact
            .into_iter()
            .partition(|r| authorizer.is_visible(caller, r));
        let (semantic, hidden_semantic): (Vec<_>, Vec<_>) = outcome
            .results
            .into_iter()
            .partition(|r| authorizer.is_visible(caller, r));
        // A document hidden from both legs counts once
        let hidden: HashSet<_> = hidden_exact
            .iter()
            .map(|r| r.id)
            .chain(hidden_semantic.iter().map(|r| r.id))
            .collect();
        let restricted = hidden.len();

        let merge_start = Instant::now();
        let merged = merge(&exact, &semantic, threshold, limit);
        let merge_dedup_ms = merge_start.elapsed().as_millis() as u64;
        let exact_matches = merged.exact_matches;
        let results = merged.results;

        let took_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            took_ms,
            exact = exact_matches.len(),
            semantic = results.len(),
            restricted,
            "Hybrid search complete"
        );

        Ok(SemanticResponse {
            results,
            exact_matches: Some(exact_matches),
            query: query_info,
            took_ms,
            performance: Performance {
                embedding_generation_ms: outcome.embedding_generation_ms,
                vector_search_ms: outcome.vector_search_ms,
                keyword_search_ms: Some(keyword_search_ms),
                merge_dedup_ms: Some(merge_dedup_ms),
            },
            metadata: self.semantic_metadata(caller, restricted),
        })
    }

    // ========================================================================
    // HEALTH
    // ========================================================================

    pub async fn health(&self) -> HealthReport {
        let store = match with_timeout(self.config.store_timeout(), self.store.ping()).await {
            Ok(()) => ComponentHealth {
                healthy: true,
                error: None,
            },
            Err(e) => ComponentHealth {
                healthy: false,
                error: Some(e.to_string()),
            },
        };

        HealthReport {
            status: if store.healthy { "ok" } else { "degraded" },
            version: crate::VERSION,
            store,
            cache: self.cache.stats(),
            embedding_model: self.semantic.model_name().to_string(),
        }
    }

    fn restriction_message(&self, caller: &Caller, restricted: usize) -> Option<String> {
        if restricted == 0 {
            return None;
        }
        let message = self
            .authorizer
            .describe_restriction(caller)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_RESTRICTION_MESSAGE.to_string());
        Some(message)
    }

    fn semantic_metadata(&self, caller: &Caller, restricted: usize) -> Option<SemanticMetadata> {
        (restricted > 0).then(|| SemanticMetadata {
            restricted,
            restricted_message: self.restriction_message(caller, restricted),
        })
    }
}

/// Distinct corrections carried by visible suggestions, best first
fn typo_corrections(suggestions: &[Suggestion]) -> Vec<TypoCorrection> {
    let mut corrections: Vec<TypoCorrection> = Vec::new();
    for correction in suggestions.iter().filter_map(|s| s.typo_correction.as_ref()) {
        match corrections.iter_mut().find(|c| c.corrected == correction.corrected) {
            Some(existing) => {
                existing.similarity_score = existing.similarity_score.max(correction.similarity_score);
            }
            None => corrections.push(correction.clone()),
        }
    }
    corrections.sort_by(|a, b| {
        b.similarity_score
            .total_cmp(&a.similarity_score)
            .then_with(|| a.corrected.cmp(&b.corrected))
    });
    corrections.truncate(MAX_TYPO_CORRECTIONS);
    corrections
}

/// Keyword side of a hybrid query: the Boolean grammar when it parses,
/// otherwise the plain words
fn keyword_expression(text: &str) -> Option<BooleanExpr> {
    let normalized = crate::query::normalize(text);
    parse_expression(&normalized)
        .or_else(|_| parse_plain(&normalized))
        .ok()
}

// ============================================================================
// TESTS
// ============================================================================
