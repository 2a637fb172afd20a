//! Embeddings Module
//!
//! Query and document vectors for semantic search:
//! - [`EmbeddingProvider`]: the seam to the external embedding service
//! - [`HttpEmbeddingClient`]: remote service client (feature `remote-embeddings`)
//! - [`HashEmbedder`]: deterministic feature-hashing embedder for offline import and tests
//! - Vector helpers (cosine similarity, dimension fitting, byte encoding)

mod hash;
#[cfg(feature = "remote-embeddings")]
mod http;

pub use hash::HashEmbedder;
#[cfg(feature = "remote-embeddings")]
pub use http::HttpEmbeddingClient;

use async_trait::async_trait;

/// Vector width expected by the store and the embedding service
pub const EMBEDDING_DIMENSIONS: usize = 1536;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Embedding error types
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    /// Service unreachable or returned a failure status
    Unavailable(String),
    /// Call exceeded its time budget
    Timeout(std::time::Duration),
    /// Response body did not contain a usable vector
    InvalidResponse(String),
    /// Vector width differs from what the caller requires
    DimensionMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for EmbeddingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingError::Unavailable(e) => write!(f, "Embedding service unavailable: {}", e),
            EmbeddingError::Timeout(d) => write!(f, "Embedding call timed out after {:?}", d),
            EmbeddingError::InvalidResponse(e) => write!(f, "Invalid embedding response: {}", e),
            EmbeddingError::DimensionMismatch { expected, actual } => write!(
                f,
                "Embedding dimension mismatch: expected {}, got {}",
                expected, actual
            ),
        }
    }
}

impl std::error::Error for EmbeddingError {}

// ============================================================================
// PROVIDER
// ============================================================================

/// Turns text into a fixed-width vector
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Width of every vector this provider returns
    fn dimensions(&self) -> usize;

    fn model_name(&self) -> &str;
}

// ============================================================================
// VECTOR HELPERS
// ============================================================================

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot_product = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = (norm_a * norm_b).sqrt();
    if denominator > 0.0 {
        dot_product / denominator
    } else {
        0.0
    }
}

/// Pad with zeros or truncate to `dimensions`
pub fn fit_dimensions(mut vector: Vec<f32>, dimensions: usize) -> Vec<f32> {
    vector.resize(dimensions, 0.0);
    vector
}

/// Scale to unit length (zero vectors are left alone)
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Little-endian f32 encoding for BLOB storage
pub fn to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Decode a BLOB written by [`to_bytes`]
pub fn from_bytes(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}
