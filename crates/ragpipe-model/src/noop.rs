//! No-op embedder for testing without a model service.
//!
//! This module provides a [`NoopEmbedder`] that returns zero-vectors for all
//! embeddings. It's useful for:
//! - Running the pipeline without a reachable embedding service
//! - Development builds where retrieval quality does not matter
//! - Stubbing embeddings in unit tests

use async_trait::async_trait;
use ragpipe_core::{Embedder, ModelError};

/// No-op embedder that returns zero-vectors.
///
/// Always succeeds and never performs I/O. Vector search over zero-vectors
/// is meaningless, so this is strictly a plumbing aid.
///
/// # Example
///
/// ```rust
/// use ragpipe_model::NoopEmbedder;
/// use ragpipe_core::Embedder;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let embedder = NoopEmbedder::new();
/// let vectors = embedder.embed_batch(&["Hello", "World"]).await?;
///
/// assert_eq!(vectors.len(), 2);
/// assert_eq!(vectors[0].len(), 1024);
/// assert!(vectors[0].iter().all(|&v| v == 0.0));
/// # Ok(())
/// # }
/// ```
pub struct NoopEmbedder {
    dimension: usize,
}

impl NoopEmbedder {
    /// Create a new no-op embedder with default dimension (1024).
    #[must_use]
    pub fn new() -> Self {
        Self { dimension: 1024 }
    }

    /// Create a new no-op embedder with custom dimension.
    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for NoopEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for NoopEmbedder {
    fn model_name(&self) -> &str {
        "noop"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ModelError> {
        Ok(texts.iter().map(|_| vec![0.0; self.dimension]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_new() {
        let embedder = NoopEmbedder::new();
        assert_eq!(embedder.dimension(), 1024);
        assert_eq!(embedder.model_name(), "noop");
    }

    #[test]
    fn test_noop_with_dimension() {
        let embedder = NoopEmbedder::with_dimension(768);
        assert_eq!(embedder.dimension(), 768);
    }

    #[tokio::test]
    async fn test_noop_embed_batch() {
        let embedder = NoopEmbedder::new();
        let vectors = embedder.embed_batch(&["Hello", "World"]).await.unwrap();

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), 1024);
        assert!(vectors[0].iter().all(|&v| v == 0.0));
    }

    #[tokio::test]
    async fn test_noop_embed_single() {
        let embedder = NoopEmbedder::with_dimension(8);
        let vector = embedder.embed("anything").await.unwrap();
        assert_eq!(vector.len(), 8);
    }

    #[tokio::test]
    async fn test_noop_embed_empty() {
        let embedder = NoopEmbedder::new();
        let vectors = embedder.embed_batch(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }
}
