//! Fake collaborators
//!
//! Stand-ins for the embedding service, cache backend and store that fail
//! or stall on demand.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dossier_search_core::storage::{DocumentQuery, PrefixQuery, VectorHit, VectorQuery};
use dossier_search_core::{
    CacheBackend, CacheError, Document, EmbeddingError, EmbeddingProvider, SearchStore, StoreError,
};

type StoreResult<T> = Result<T, StoreError>;

/// Embedding service that is always down
pub struct DownEmbedder {
    pub dimensions: usize,
}

impl Default for DownEmbedder {
    fn default() -> Self {
        Self { dimensions: 1536 }
    }
}

#[async_trait]
impl EmbeddingProvider for DownEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Unavailable("connection refused".to_string()))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "down"
    }
}

/// Cache backend that refuses every call
#[derive(Default)]
pub struct DownCache {
    pub calls: AtomicUsize,
}

#[async_trait]
impl CacheBackend for DownCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    fn name(&self) -> &'static str {
        "down"
    }
}

/// Cache backend whose calls never complete in time
pub struct HangingCache {
    pub stall: Duration,
}

impl Default for HangingCache {
    fn default() -> Self {
        Self {
            stall: Duration::from_secs(10),
        }
    }
}

#[async_trait]
impl CacheBackend for HangingCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        tokio::time::sleep(self.stall).await;
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        tokio::time::sleep(self.stall).await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "hanging"
    }
}

/// Store that is always down
#[derive(Default)]
pub struct DownStore;

#[async_trait]
impl SearchStore for DownStore {
    async fn candidates(&self, _query: &DocumentQuery) -> StoreResult<Vec<Document>> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn prefix_lookup(&self, _query: &PrefixQuery) -> StoreResult<Vec<Document>> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn nearest(&self, _query: &VectorQuery) -> StoreResult<Vec<VectorHit>> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn ping(&self) -> StoreResult<()> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

/// Delays every call to an inner store
pub struct DelayedStore {
    pub inner: Arc<dyn SearchStore>,
    pub delay: Duration,
}

impl DelayedStore {
    pub fn new(inner: Arc<dyn SearchStore>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl SearchStore for DelayedStore {
    async fn candidates(&self, query: &DocumentQuery) -> StoreResult<Vec<Document>> {
        tokio::time::sleep(self.delay).await;
        self.inner.candidates(query).await
    }

    async fn prefix_lookup(&self, query: &PrefixQuery) -> StoreResult<Vec<Document>> {
        tokio::time::sleep(self.delay).await;
        self.inner.prefix_lookup(query).await
    }

    async fn nearest(&self, query: &VectorQuery) -> StoreResult<Vec<VectorHit>> {
        tokio::time::sleep(self.delay).await;
        self.inner.nearest(query).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }
}
