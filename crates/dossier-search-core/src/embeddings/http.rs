//! Remote embedding service client
//!
//! POSTs `{"text": ...}` with bearer auth and reads `{"embedding": [...]}`.
//! Vectors are padded with zeros or truncated to the configured width.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EMBEDDING_DIMENSIONS, EmbeddingError, EmbeddingProvider, fit_dimensions};

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Option<Vec<f32>>,
}

/// Client for an external embedding service
#[derive(Debug, Clone)]
pub struct HttpEmbeddingClient {
    http_client: HttpClient,
    endpoint: String,
    api_key: Option<String>,
    dimensions: usize,
    model: String,
    timeout: Duration,
}

impl HttpEmbeddingClient {
    /// Create a client for `endpoint` with a per-call timeout
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::Unavailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
            dimensions: EMBEDDING_DIMENSIONS,
            model: "remote".to_string(),
            timeout,
        })
    }

    /// Builder: output width
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Builder: model label reported in stats and stored with embeddings
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        debug!(endpoint = %self.endpoint, chars = text.chars().count(), "Requesting embedding");

        let mut request = self.http_client.post(&self.endpoint).json(&EmbedRequest { text });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                EmbeddingError::Timeout(self.timeout)
            } else {
                EmbeddingError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingError::Unavailable(format!(
                "embedding service returned {}",
                status
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        match body.embedding {
            Some(vector) if !vector.is_empty() => Ok(fit_dimensions(vector, self.dimensions)),
            _ => Err(EmbeddingError::InvalidResponse(
                "response has no embedding".to_string(),
            )),
        }
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
