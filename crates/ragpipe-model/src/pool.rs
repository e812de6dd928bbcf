//! Embedder pool for bounding concurrent embedding calls.

use async_trait::async_trait;
use ragpipe_core::{Embedder, ModelError};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Wraps an embedder with a concurrency limit.
///
/// Ingestion fans out across batches; the pool caps how many of those
/// batches may hit the embedding service at once so a large ingestion run
/// stays within the service's rate limits. The pool is itself an
/// [`Embedder`], so callers need not know whether they hold a bare adapter
/// or a pooled one.
pub struct EmbedderPool {
    inner: Arc<dyn Embedder>,
    semaphore: Semaphore,
    max_concurrent: usize,
}

impl EmbedderPool {
    /// Create a pool allowing at most `max_concurrent` in-flight calls.
    pub fn new(inner: Arc<dyn Embedder>, max_concurrent: usize) -> Self {
        Self {
            inner,
            semaphore: Semaphore::new(max_concurrent),
            max_concurrent,
        }
    }

    /// Permits not currently held by an in-flight call.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// The configured concurrency limit.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}

#[async_trait]
impl Embedder for EmbedderPool {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ModelError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| ModelError::Response(format!("semaphore error: {e}")))?;

        self.inner.embed_batch(texts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TEST_DIM: usize = 16;

    /// Mock embedder that tracks its peak concurrency.
    struct TrackingEmbedder {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl TrackingEmbedder {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for TrackingEmbedder {
        fn model_name(&self) -> &str {
            "tracking"
        }

        fn dimension(&self) -> usize {
            TEST_DIM
        }

        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ModelError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            Ok(texts.iter().map(|_| vec![0.5; TEST_DIM]).collect())
        }
    }

    #[tokio::test]
    async fn test_pool_creation() {
        let pool = EmbedderPool::new(Arc::new(TrackingEmbedder::new()), 4);

        assert_eq!(pool.dimension(), TEST_DIM);
        assert_eq!(pool.model_name(), "tracking");
        assert_eq!(pool.max_concurrent(), 4);
        assert_eq!(pool.available_permits(), 4);
    }

    #[tokio::test]
    async fn test_embed_batch_passes_through() {
        let pool = EmbedderPool::new(Arc::new(TrackingEmbedder::new()), 4);

        let vectors = pool.embed_batch(&["hello", "world"]).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), TEST_DIM);
    }

    #[tokio::test]
    async fn test_semaphore_limits_concurrency() {
        let tracker = Arc::new(TrackingEmbedder::new());
        let pool = Arc::new(EmbedderPool::new(
            Arc::clone(&tracker) as Arc<dyn Embedder>,
            2,
        ));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = Arc::clone(&pool);
            handles.push(tokio::spawn(async move {
                pool.embed_batch(&["text"]).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(tracker.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let pool = EmbedderPool::new(Arc::new(TrackingEmbedder::new()), 4);
        let vectors = pool.embed_batch(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }
}
