//! Ingestion service: chunk, embed, and upsert document blocks.

use std::sync::Arc;

use futures::future::try_join_all;
use ragpipe_chunker::BlockChunker;
use ragpipe_core::{
    Block, Chunk, ChunkConfig, DocumentStore, Embedder, Error, IndexCreation, IndexSchema,
    IndexStats, IngestReport, Result,
};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Configuration for the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Chunking parameters
    pub chunk_config: ChunkConfig,
    /// Chunks per embedding call
    pub batch_size: usize,
    /// Batches allowed in flight at once
    pub max_concurrent_batches: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            chunk_config: ChunkConfig::default(),
            batch_size: 25,
            max_concurrent_batches: 4,
        }
    }
}

/// Outcome of embedding and upserting one batch.
struct BatchOutcome {
    indexed: usize,
    skipped: usize,
}

/// Ingestion service wiring the chunker, the embedding model, and the
/// document store.
pub struct Indexer {
    /// Target document store
    store: Arc<dyn DocumentStore>,
    /// Embedding model, usually a pooled client
    embedder: Arc<dyn Embedder>,
    /// Block chunker
    chunker: BlockChunker,
    /// Batching configuration
    config: IndexerConfig,
}

impl Indexer {
    /// Create a new indexer. Fails if the chunking or batching parameters
    /// are invalid.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn Embedder>,
        config: IndexerConfig,
    ) -> Result<Self> {
        if config.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".to_string()));
        }
        if config.max_concurrent_batches == 0 {
            return Err(Error::Config(
                "max_concurrent_batches must be at least 1".to_string(),
            ));
        }
        let chunker = BlockChunker::new(config.chunk_config.clone())?;
        Ok(Self {
            store,
            embedder,
            chunker,
            config,
        })
    }

    /// Create `index` sized for the configured embedder.
    ///
    /// Creation is idempotent: an existing index with the same vector
    /// dimension is left untouched.
    pub async fn create_index(&self, index: &str) -> Result<IndexCreation> {
        let schema = IndexSchema::new(self.embedder.dimension());
        let outcome = self.store.create_index(index, schema).await?;
        match outcome {
            IndexCreation::Created => info!(
                "Created index '{}' ({} dims, model {})",
                index,
                schema.vector_dims,
                self.embedder.model_name()
            ),
            IndexCreation::AlreadyExists => info!("Index '{}' already exists", index),
        }
        Ok(outcome)
    }

    /// Ingest document blocks into `index`.
    ///
    /// Blocks are chunked, embedded `batch_size` chunks at a time, and
    /// upserted, with at most `max_concurrent_batches` batches in flight.
    /// When a batch embedding call fails, the batch is retried one chunk at
    /// a time; chunks that still fail are skipped and counted in the report.
    /// Store errors abort the ingest. The index is refreshed before
    /// returning, so ingested chunks are immediately searchable.
    pub async fn ingest(
        &self,
        index: &str,
        source: &str,
        blocks: &[Block],
    ) -> Result<IngestReport> {
        let chunks = self.chunker.chunk(source, blocks)?;
        let chunks_total = chunks.len();

        let batches: Vec<Vec<Chunk>> = chunks
            .chunks(self.config.batch_size)
            .map(|batch| batch.to_vec())
            .collect();
        let batch_count = batches.len();
        info!(
            "Ingesting '{}' into '{}': {} blocks, {} chunks, {} batches",
            source,
            index,
            blocks.len(),
            chunks_total,
            batch_count
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_batches));
        let jobs = batches.into_iter().enumerate().map(|(batch_no, batch)| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| Error::Cancelled { stage: "ingest" })?;
                self.index_batch(index, batch_no, batch).await
            }
        });
        let outcomes = try_join_all(jobs).await?;

        let mut report = IngestReport {
            chunks_total,
            batches: batch_count,
            ..IngestReport::default()
        };
        for outcome in outcomes {
            report.chunks_indexed += outcome.indexed;
            report.chunks_skipped += outcome.skipped;
        }

        self.store.refresh(index).await?;
        info!(
            "Ingested '{}': {}/{} chunks indexed, {} skipped",
            source, report.chunks_indexed, report.chunks_total, report.chunks_skipped
        );
        Ok(report)
    }

    /// Remove `index` and everything in it. Returns false when it did not
    /// exist.
    pub async fn delete_index(&self, index: &str) -> Result<bool> {
        let deleted = self.store.delete_index(index).await?;
        if deleted {
            info!("Deleted index '{}'", index);
        }
        Ok(deleted)
    }

    /// Document count and storage footprint of `index`.
    pub async fn stats(&self, index: &str) -> Result<IndexStats> {
        Ok(self.store.stats(index).await?)
    }

    /// Embed one batch and upsert it. Embedding failures degrade to
    /// per-chunk retries; store failures propagate.
    async fn index_batch(
        &self,
        index: &str,
        batch_no: usize,
        mut batch: Vec<Chunk>,
    ) -> Result<BatchOutcome> {
        let total = batch.len();
        let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();

        match self.embedder.embed_batch(&texts).await {
            Ok(vectors) => {
                for (chunk, vector) in batch.iter_mut().zip(vectors) {
                    chunk.embedding = Some(vector);
                }
            }
            Err(e) => {
                warn!(
                    "Embedding batch {} failed ({}), retrying chunks one at a time",
                    batch_no, e
                );
                batch = self.embed_singly(batch).await;
            }
        }

        let skipped = total - batch.len();
        if batch.is_empty() {
            return Ok(BatchOutcome { indexed: 0, skipped });
        }

        self.store.upsert_chunks(index, &batch).await?;
        debug!("Indexed batch {} ({} chunks)", batch_no, batch.len());
        Ok(BatchOutcome {
            indexed: batch.len(),
            skipped,
        })
    }

    /// Retry a failed batch chunk by chunk, dropping chunks that still fail.
    async fn embed_singly(&self, batch: Vec<Chunk>) -> Vec<Chunk> {
        let mut kept = Vec::with_capacity(batch.len());
        for mut chunk in batch {
            match self.embedder.embed(&chunk.text).await {
                Ok(vector) => {
                    chunk.embedding = Some(vector);
                    kept.push(chunk);
                }
                Err(e) => warn!("Skipping chunk {} of '{}': {}", chunk.id, chunk.source, e),
            }
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragpipe_core::{ChunkError, ModelError, StoreError};
    use ragpipe_store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TEST_DIM: usize = 8;

    // ==================== Mock Embedders ====================

    /// Deterministic embedder: vectors derived from text length.
    struct MockEmbedder;

    impl MockEmbedder {
        fn vector(text: &str) -> Vec<f32> {
            let mut v = vec![0.0; TEST_DIM];
            v[0] = 1.0;
            v[1] = text.len() as f32;
            v
        }
    }

    #[async_trait::async_trait]
    impl Embedder for MockEmbedder {
        fn model_name(&self) -> &str {
            "mock-embedder"
        }

        fn dimension(&self) -> usize {
            TEST_DIM
        }

        async fn embed_batch(
            &self,
            texts: &[&str],
        ) -> std::result::Result<Vec<Vec<f32>>, ModelError> {
            Ok(texts.iter().map(|t| Self::vector(t)).collect())
        }
    }

    /// Embedder that rejects every call containing the poison marker, so a
    /// poisoned batch fails wholesale and only the clean chunks survive the
    /// per-chunk retry.
    struct FlakyEmbedder {
        poison: &'static str,
        single_calls: AtomicUsize,
    }

    impl FlakyEmbedder {
        fn new(poison: &'static str) -> Self {
            Self {
                poison,
                single_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl Embedder for FlakyEmbedder {
        fn model_name(&self) -> &str {
            "flaky-embedder"
        }

        fn dimension(&self) -> usize {
            TEST_DIM
        }

        async fn embed_batch(
            &self,
            texts: &[&str],
        ) -> std::result::Result<Vec<Vec<f32>>, ModelError> {
            if texts.len() == 1 {
                self.single_calls.fetch_add(1, Ordering::SeqCst);
            }
            if texts.iter().any(|t| t.contains(self.poison)) {
                return Err(ModelError::Api {
                    status: 500,
                    message: "poisoned input".to_string(),
                });
            }
            Ok(texts.iter().map(|t| MockEmbedder::vector(t)).collect())
        }
    }

    /// Embedder that records its peak number of concurrent calls.
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

    #[async_trait::async_trait]
    impl Embedder for TrackingEmbedder {
        fn model_name(&self) -> &str {
            "tracking-embedder"
        }

        fn dimension(&self) -> usize {
            TEST_DIM
        }

        async fn embed_batch(
            &self,
            texts: &[&str],
        ) -> std::result::Result<Vec<Vec<f32>>, ModelError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| MockEmbedder::vector(t)).collect())
        }
    }

    // ==================== Helpers ====================

    fn text_blocks(texts: &[&str]) -> Vec<Block> {
        texts.iter().map(|t| Block::text(*t, 1)).collect()
    }

    async fn indexer_with(
        embedder: Arc<dyn Embedder>,
        config: IndexerConfig,
    ) -> (Indexer, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let indexer = Indexer::new(
            Arc::clone(&store) as Arc<dyn DocumentStore>,
            embedder,
            config,
        )
        .unwrap();
        indexer.create_index("docs").await.unwrap();
        (indexer, store)
    }

    // ==================== Config Tests ====================

    #[test]
    fn test_indexer_config_default() {
        let config = IndexerConfig::default();
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.max_concurrent_batches, 4);
        assert_eq!(config.chunk_config.chunk_size, 1024);
    }

    #[tokio::test]
    async fn test_zero_batch_size_rejected() {
        let store = Arc::new(MemoryStore::new());
        let config = IndexerConfig {
            batch_size: 0,
            ..IndexerConfig::default()
        };
        let result = Indexer::new(store, Arc::new(MockEmbedder), config);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_zero_concurrency_rejected() {
        let store = Arc::new(MemoryStore::new());
        let config = IndexerConfig {
            max_concurrent_batches: 0,
            ..IndexerConfig::default()
        };
        let result = Indexer::new(store, Arc::new(MockEmbedder), config);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_invalid_chunk_config_rejected() {
        let store = Arc::new(MemoryStore::new());
        let config = IndexerConfig {
            chunk_config: ChunkConfig {
                chunk_size: 100,
                chunk_overlap: 100,
            },
            ..IndexerConfig::default()
        };
        let result = Indexer::new(store, Arc::new(MockEmbedder), config);
        assert!(matches!(result, Err(Error::Chunking(_))));
    }

    // ==================== Index Lifecycle Tests ====================

    #[tokio::test]
    async fn test_create_index_reports_created_then_exists() {
        let store = Arc::new(MemoryStore::new());
        let indexer = Indexer::new(store, Arc::new(MockEmbedder), IndexerConfig::default())
            .unwrap();

        let first = indexer.create_index("docs").await.unwrap();
        assert_eq!(first, IndexCreation::Created);

        let second = indexer.create_index("docs").await.unwrap();
        assert_eq!(second, IndexCreation::AlreadyExists);
    }

    #[tokio::test]
    async fn test_delete_index_passthrough() {
        let (indexer, _store) = indexer_with(Arc::new(MockEmbedder), IndexerConfig::default())
            .await;

        assert!(indexer.delete_index("docs").await.unwrap());
        assert!(!indexer.delete_index("docs").await.unwrap());
    }

    #[tokio::test]
    async fn test_stats_after_delete_is_an_error() {
        let (indexer, _store) = indexer_with(Arc::new(MockEmbedder), IndexerConfig::default())
            .await;

        indexer.delete_index("docs").await.unwrap();
        let result = indexer.stats("docs").await;
        assert!(matches!(
            result,
            Err(Error::Store(StoreError::IndexNotFound(_)))
        ));
    }

    // ==================== Ingest Tests ====================

    #[tokio::test]
    async fn test_ingest_indexes_all_chunks() {
        let config = IndexerConfig {
            batch_size: 2,
            ..IndexerConfig::default()
        };
        let (indexer, _store) = indexer_with(Arc::new(MockEmbedder), config).await;

        let blocks = text_blocks(&[
            "the first passage",
            "the second passage",
            "the third passage",
            "the fourth passage",
            "the fifth passage",
        ]);
        let report = indexer.ingest("docs", "manual.pdf", &blocks).await.unwrap();

        assert_eq!(report.chunks_total, 5);
        assert_eq!(report.chunks_indexed, 5);
        assert_eq!(report.chunks_skipped, 0);
        assert_eq!(report.batches, 3);

        let stats = indexer.stats("docs").await.unwrap();
        assert_eq!(stats.doc_count, 5);
        assert!(stats.last_updated.is_some());
    }

    #[tokio::test]
    async fn test_ingested_chunks_are_searchable() {
        let (indexer, store) = indexer_with(Arc::new(MockEmbedder), IndexerConfig::default())
            .await;

        let blocks = text_blocks(&["the reactor manual covers shutdown procedures"]);
        indexer.ingest("docs", "manual.pdf", &blocks).await.unwrap();

        let hits = store
            .search_lexical("docs", "reactor shutdown", 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.source, "manual.pdf");
    }

    #[tokio::test]
    async fn test_reingest_keeps_doc_count() {
        let (indexer, _store) = indexer_with(Arc::new(MockEmbedder), IndexerConfig::default())
            .await;

        let blocks = text_blocks(&["alpha passage", "beta passage"]);
        indexer.ingest("docs", "manual.pdf", &blocks).await.unwrap();
        let first = indexer.stats("docs").await.unwrap().doc_count;

        indexer.ingest("docs", "manual.pdf", &blocks).await.unwrap();
        let second = indexer.stats("docs").await.unwrap().doc_count;

        assert_eq!(first, 2);
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_mixed_block_types_all_indexed() {
        let (indexer, _store) = indexer_with(Arc::new(MockEmbedder), IndexerConfig::default())
            .await;

        let blocks = vec![
            Block::text("a plain text passage", 1),
            Block {
                text: "diagram of the cooling loop".to_string(),
                content_type: ragpipe_core::ContentType::Image,
                page: 2,
            },
            Block {
                text: "pressure | temperature | flow".to_string(),
                content_type: ragpipe_core::ContentType::Table,
                page: 3,
            },
        ];
        let report = indexer.ingest("docs", "manual.pdf", &blocks).await.unwrap();

        assert_eq!(report.chunks_total, 3);
        assert_eq!(report.chunks_indexed, 3);
    }

    #[tokio::test]
    async fn test_all_empty_blocks_is_an_error() {
        let (indexer, _store) = indexer_with(Arc::new(MockEmbedder), IndexerConfig::default())
            .await;

        let blocks = text_blocks(&["", "   ", "\n\t"]);
        let result = indexer.ingest("docs", "empty.pdf", &blocks).await;
        assert!(matches!(
            result,
            Err(Error::Chunking(ChunkError::EmptySource(_)))
        ));
    }

    // ==================== Failure Handling Tests ====================

    #[tokio::test]
    async fn test_failed_batch_retries_chunks_singly() {
        let embedder = Arc::new(FlakyEmbedder::new("POISON"));
        let config = IndexerConfig {
            batch_size: 25,
            ..IndexerConfig::default()
        };
        let (indexer, _store) = indexer_with(
            Arc::clone(&embedder) as Arc<dyn Embedder>,
            config,
        )
        .await;

        let blocks = text_blocks(&[
            "a clean passage",
            "a POISON passage",
            "another clean passage",
        ]);
        let report = indexer.ingest("docs", "manual.pdf", &blocks).await.unwrap();

        assert_eq!(report.chunks_total, 3);
        assert_eq!(report.chunks_indexed, 2);
        assert_eq!(report.chunks_skipped, 1);
        // The whole batch was retried one chunk at a time.
        assert_eq!(embedder.single_calls.load(Ordering::SeqCst), 3);

        let stats = indexer.stats("docs").await.unwrap();
        assert_eq!(stats.doc_count, 2);
    }

    #[tokio::test]
    async fn test_fully_failed_batch_skips_everything() {
        let embedder = Arc::new(FlakyEmbedder::new("passage"));
        let (indexer, _store) = indexer_with(
            Arc::clone(&embedder) as Arc<dyn Embedder>,
            IndexerConfig::default(),
        )
        .await;

        let blocks = text_blocks(&["first passage", "second passage"]);
        let report = indexer.ingest("docs", "manual.pdf", &blocks).await.unwrap();

        assert_eq!(report.chunks_indexed, 0);
        assert_eq!(report.chunks_skipped, 2);

        let stats = indexer.stats("docs").await.unwrap();
        assert_eq!(stats.doc_count, 0);
    }

    #[tokio::test]
    async fn test_store_errors_are_fatal() {
        let store = Arc::new(MemoryStore::new());
        let indexer = Indexer::new(store, Arc::new(MockEmbedder), IndexerConfig::default())
            .unwrap();

        // No create_index call, so the upsert hits a missing index.
        let blocks = text_blocks(&["a passage"]);
        let result = indexer.ingest("missing", "manual.pdf", &blocks).await;
        assert!(matches!(
            result,
            Err(Error::Store(StoreError::IndexNotFound(_)))
        ));
    }

    // ==================== Concurrency Tests ====================

    #[tokio::test]
    async fn test_batches_stay_within_concurrency_bound() {
        let embedder = Arc::new(TrackingEmbedder::new());
        let config = IndexerConfig {
            batch_size: 1,
            max_concurrent_batches: 2,
            ..IndexerConfig::default()
        };
        let (indexer, _store) = indexer_with(
            Arc::clone(&embedder) as Arc<dyn Embedder>,
            config,
        )
        .await;

        let texts: Vec<String> = (0..8).map(|i| format!("passage number {i}")).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let blocks = text_blocks(&refs);
        let report = indexer.ingest("docs", "manual.pdf", &blocks).await.unwrap();

        assert_eq!(report.batches, 8);
        assert_eq!(report.chunks_indexed, 8);
        assert!(embedder.peak.load(Ordering::SeqCst) <= 2);
    }
}
