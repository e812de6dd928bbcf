//! In-memory store for testing without Elasticsearch.
//!
//! This module provides a [`MemoryStore`] that keeps indexes and chunks in
//! memory. It's useful for:
//! - Testing without a running Elasticsearch
//! - Development builds with faster iteration
//! - Unit tests that don't need persistence

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ragpipe_core::{
    Chunk, DocumentStore, IndexCreation, IndexSchema, IndexStats, ScoredChunk, StoreError,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

struct IndexState {
    schema: IndexSchema,
    docs: HashMap<String, Chunk>,
    last_updated: Option<DateTime<Utc>>,
}

/// In-memory document store for testing.
///
/// Search is brute force: cosine similarity for vector search and token
/// overlap for lexical search. Not suitable for production corpora but
/// behaviorally equivalent to a real backend for the pipeline's purposes,
/// including schema checks, threshold filtering and deterministic ordering.
///
/// # Example
///
/// ```rust
/// use ragpipe_store::MemoryStore;
/// use ragpipe_core::{DocumentStore, IndexSchema};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// store.create_index("docs", IndexSchema::new(384)).await?;
///
/// let stats = store.stats("docs").await?;
/// assert_eq!(stats.doc_count, 0);
/// # Ok(())
/// # }
/// ```
pub struct MemoryStore {
    indexes: Arc<RwLock<HashMap<String, IndexState>>>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            indexes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Compute cosine similarity between two vectors.
    ///
    /// Mismatched lengths and zero vectors score 0.0 rather than erroring.
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot / (norm_a * norm_b)
    }

    /// Count how many distinct query tokens appear in the text.
    fn token_overlap(query: &str, text: &str) -> usize {
        let doc_tokens: std::collections::HashSet<String> = tokenize(text).collect();
        let mut query_tokens: Vec<String> = tokenize(query).collect();
        query_tokens.sort_unstable();
        query_tokens.dedup();
        query_tokens
            .iter()
            .filter(|t| doc_tokens.contains(*t))
            .count()
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

/// Sort hits by score descending, then chunk id ascending so equal scores
/// always come back in the same order.
fn sort_hits(hits: &mut [ScoredChunk]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk.id.cmp(&b.chunk.id))
    });
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_index(
        &self,
        index: &str,
        schema: IndexSchema,
    ) -> Result<IndexCreation, StoreError> {
        let mut indexes = self.indexes.write().await;
        if let Some(existing) = indexes.get(index) {
            if existing.schema.vector_dims != schema.vector_dims {
                return Err(StoreError::SchemaConflict {
                    index: index.to_string(),
                    expected: schema.vector_dims,
                    actual: existing.schema.vector_dims,
                });
            }
            return Ok(IndexCreation::AlreadyExists);
        }

        indexes.insert(
            index.to_string(),
            IndexState {
                schema,
                docs: HashMap::new(),
                last_updated: None,
            },
        );
        debug!(
            "Created index '{}' (dimension: {})",
            index, schema.vector_dims
        );
        Ok(IndexCreation::Created)
    }

    async fn index_exists(&self, index: &str) -> Result<bool, StoreError> {
        let indexes = self.indexes.read().await;
        Ok(indexes.contains_key(index))
    }

    async fn delete_index(&self, index: &str) -> Result<bool, StoreError> {
        let mut indexes = self.indexes.write().await;
        let removed = indexes.remove(index).is_some();
        if removed {
            debug!("Deleted index '{}'", index);
        }
        Ok(removed)
    }

    async fn upsert_chunks(&self, index: &str, chunks: &[Chunk]) -> Result<(), StoreError> {
        let mut indexes = self.indexes.write().await;
        let state = indexes
            .get_mut(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;

        for chunk in chunks {
            let embedding = chunk
                .embedding
                .as_ref()
                .ok_or_else(|| StoreError::MissingEmbedding(chunk.id.clone()))?;
            if embedding.len() != state.schema.vector_dims {
                return Err(StoreError::DimensionMismatch {
                    chunk_id: chunk.id.clone(),
                    expected: state.schema.vector_dims,
                    actual: embedding.len(),
                });
            }
            state.docs.insert(chunk.id.clone(), chunk.clone());
        }

        state.last_updated = Some(Utc::now());
        debug!("Upserted {} chunks into '{}'", chunks.len(), index);
        Ok(())
    }

    async fn refresh(&self, index: &str) -> Result<(), StoreError> {
        // Writes are immediately visible here; only validate the index.
        let indexes = self.indexes.read().await;
        if !indexes.contains_key(index) {
            return Err(StoreError::IndexNotFound(index.to_string()));
        }
        Ok(())
    }

    async fn search_lexical(
        &self,
        index: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        let indexes = self.indexes.read().await;
        let state = indexes
            .get(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;

        let mut hits: Vec<ScoredChunk> = state
            .docs
            .values()
            .filter_map(|chunk| {
                let overlap = Self::token_overlap(query, &chunk.text);
                (overlap > 0).then(|| ScoredChunk {
                    chunk: chunk.clone(),
                    score: overlap as f32,
                })
            })
            .collect();

        sort_hits(&mut hits);
        hits.truncate(limit);
        Ok(hits)
    }

    async fn search_vector(
        &self,
        index: &str,
        vector: &[f32],
        limit: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        let indexes = self.indexes.read().await;
        let state = indexes
            .get(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;

        let mut hits: Vec<ScoredChunk> = state
            .docs
            .values()
            .filter_map(|chunk| {
                let embedding = chunk.embedding.as_ref()?;
                let score = Self::cosine_similarity(vector, embedding);
                if let Some(min) = threshold {
                    if score < min {
                        return None;
                    }
                }
                Some(ScoredChunk {
                    chunk: chunk.clone(),
                    score,
                })
            })
            .collect();

        sort_hits(&mut hits);
        hits.truncate(limit);
        Ok(hits)
    }

    async fn stats(&self, index: &str) -> Result<IndexStats, StoreError> {
        let indexes = self.indexes.read().await;
        let state = indexes
            .get(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;

        let size_bytes: u64 = state
            .docs
            .values()
            .map(|c| {
                let vector_bytes = c.embedding.as_ref().map_or(0, |e| e.len() * 4);
                (c.text.len() + vector_bytes) as u64
            })
            .sum();

        Ok(IndexStats {
            doc_count: state.docs.len() as u64,
            size_bytes,
            last_updated: state.last_updated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragpipe_core::ContentType;

    fn test_chunk(id: &str, text: &str, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: id.to_string(),
            text: text.to_string(),
            embedding: Some(embedding),
            source: "test.pdf".to_string(),
            page: 1,
            content_type: ContentType::Text,
        }
    }

    // ==================== Index Lifecycle Tests ====================

    #[tokio::test]
    async fn test_create_then_exists_then_delete() {
        let store = MemoryStore::new();
        assert!(!store.index_exists("docs").await.unwrap());

        let outcome = store.create_index("docs", IndexSchema::new(3)).await.unwrap();
        assert_eq!(outcome, IndexCreation::Created);
        assert!(store.index_exists("docs").await.unwrap());

        assert!(store.delete_index("docs").await.unwrap());
        assert!(!store.index_exists("docs").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_index_returns_false() {
        let store = MemoryStore::new();
        assert!(!store.delete_index("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let store = MemoryStore::new();
        store.create_index("docs", IndexSchema::new(3)).await.unwrap();
        store
            .upsert_chunks("docs", &[test_chunk("a", "hello", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();

        let outcome = store.create_index("docs", IndexSchema::new(3)).await.unwrap();
        assert_eq!(outcome, IndexCreation::AlreadyExists);

        // Existing documents untouched.
        let stats = store.stats("docs").await.unwrap();
        assert_eq!(stats.doc_count, 1);
    }

    #[tokio::test]
    async fn test_create_with_conflicting_dimension_fails() {
        let store = MemoryStore::new();
        store.create_index("docs", IndexSchema::new(3)).await.unwrap();

        let result = store.create_index("docs", IndexSchema::new(4)).await;
        match result {
            Err(StoreError::SchemaConflict {
                index,
                expected,
                actual,
            }) => {
                assert_eq!(index, "docs");
                assert_eq!(expected, 4);
                assert_eq!(actual, 3);
            }
            other => panic!("expected SchemaConflict, got {other:?}"),
        }
    }

    // ==================== Upsert Tests ====================

    #[tokio::test]
    async fn test_upsert_into_missing_index_fails() {
        let store = MemoryStore::new();
        let result = store
            .upsert_chunks("nope", &[test_chunk("a", "x", vec![1.0])])
            .await;
        assert!(matches!(result, Err(StoreError::IndexNotFound(_))));
    }

    #[tokio::test]
    async fn test_upsert_rejects_missing_embedding() {
        let store = MemoryStore::new();
        store.create_index("docs", IndexSchema::new(3)).await.unwrap();

        let mut chunk = test_chunk("a", "x", vec![1.0, 0.0, 0.0]);
        chunk.embedding = None;

        let result = store.upsert_chunks("docs", &[chunk]).await;
        assert!(matches!(result, Err(StoreError::MissingEmbedding(id)) if id == "a"));
    }

    #[tokio::test]
    async fn test_upsert_rejects_wrong_dimension() {
        let store = MemoryStore::new();
        store.create_index("docs", IndexSchema::new(3)).await.unwrap();

        let result = store
            .upsert_chunks("docs", &[test_chunk("a", "x", vec![1.0, 0.0])])
            .await;
        match result {
            Err(StoreError::DimensionMismatch {
                chunk_id,
                expected,
                actual,
            }) => {
                assert_eq!(chunk_id, "a");
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("expected DimensionMismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reingest_same_ids_overwrites_not_duplicates() {
        let store = MemoryStore::new();
        store.create_index("docs", IndexSchema::new(3)).await.unwrap();

        let chunks = vec![
            test_chunk("a", "first", vec![1.0, 0.0, 0.0]),
            test_chunk("b", "second", vec![0.0, 1.0, 0.0]),
        ];
        store.upsert_chunks("docs", &chunks).await.unwrap();
        store.upsert_chunks("docs", &chunks).await.unwrap();

        let stats = store.stats("docs").await.unwrap();
        assert_eq!(stats.doc_count, 2);
    }

    // ==================== Vector Search Tests ====================

    #[tokio::test]
    async fn test_vector_search_nearest_first() {
        let store = MemoryStore::new();
        store.create_index("docs", IndexSchema::new(3)).await.unwrap();
        store
            .upsert_chunks(
                "docs",
                &[
                    test_chunk("a", "x axis", vec![1.0, 0.0, 0.0]),
                    test_chunk("b", "y axis", vec![0.0, 1.0, 0.0]),
                    test_chunk("c", "z axis", vec![0.0, 0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let hits = store
            .search_vector("docs", &[1.0, 0.0, 0.0], 2, None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.id, "a");
        assert!((hits[0].score - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_vector_search_threshold_filters_low_similarity() {
        let store = MemoryStore::new();
        store.create_index("docs", IndexSchema::new(2)).await.unwrap();
        store
            .upsert_chunks(
                "docs",
                &[
                    test_chunk("close", "near", vec![1.0, 0.0]),
                    test_chunk("far", "distant", vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let hits = store
            .search_vector("docs", &[1.0, 0.0], 10, Some(0.8))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.id, "close");
        for hit in &hits {
            assert!(hit.score >= 0.8);
        }
    }

    #[tokio::test]
    async fn test_vector_search_tie_breaks_by_id() {
        let store = MemoryStore::new();
        store.create_index("docs", IndexSchema::new(2)).await.unwrap();
        // Identical embeddings, identical scores.
        store
            .upsert_chunks(
                "docs",
                &[
                    test_chunk("bbb", "same", vec![1.0, 0.0]),
                    test_chunk("aaa", "same", vec![1.0, 0.0]),
                    test_chunk("ccc", "same", vec![1.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let hits = store
            .search_vector("docs", &[1.0, 0.0], 10, None)
            .await
            .unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["aaa", "bbb", "ccc"]);
    }

    // ==================== Lexical Search Tests ====================

    #[tokio::test]
    async fn test_lexical_search_ranks_by_overlap() {
        let store = MemoryStore::new();
        store.create_index("docs", IndexSchema::new(2)).await.unwrap();
        store
            .upsert_chunks(
                "docs",
                &[
                    test_chunk("one", "rust memory safety", vec![1.0, 0.0]),
                    test_chunk("two", "rust ownership and memory model", vec![0.0, 1.0]),
                    test_chunk("three", "python garbage collection", vec![1.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let hits = store
            .search_lexical("docs", "rust memory safety", 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.id, "one");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_lexical_search_is_case_insensitive() {
        let store = MemoryStore::new();
        store.create_index("docs", IndexSchema::new(2)).await.unwrap();
        store
            .upsert_chunks("docs", &[test_chunk("a", "The Rust Book", vec![1.0, 0.0])])
            .await
            .unwrap();

        let hits = store.search_lexical("docs", "rust book", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_lexical_search_missing_index_fails() {
        let store = MemoryStore::new();
        let result = store.search_lexical("nope", "anything", 10).await;
        assert!(matches!(result, Err(StoreError::IndexNotFound(_))));
    }

    #[tokio::test]
    async fn test_search_on_empty_index_returns_no_hits() {
        let store = MemoryStore::new();
        store.create_index("docs", IndexSchema::new(2)).await.unwrap();

        let lexical = store.search_lexical("docs", "anything", 10).await.unwrap();
        assert!(lexical.is_empty());

        let vector = store
            .search_vector("docs", &[1.0, 0.0], 10, None)
            .await
            .unwrap();
        assert!(vector.is_empty());
    }

    // ==================== Stats Tests ====================

    #[tokio::test]
    async fn test_stats_counts_documents() {
        let store = MemoryStore::new();
        store.create_index("docs", IndexSchema::new(2)).await.unwrap();

        let stats = store.stats("docs").await.unwrap();
        assert_eq!(stats.doc_count, 0);
        assert!(stats.last_updated.is_none());

        store
            .upsert_chunks("docs", &[test_chunk("a", "hello world", vec![1.0, 0.0])])
            .await
            .unwrap();

        let stats = store.stats("docs").await.unwrap();
        assert_eq!(stats.doc_count, 1);
        assert!(stats.size_bytes > 0);
        assert!(stats.last_updated.is_some());
    }

    // ==================== Similarity Tests ====================

    #[test]
    fn test_cosine_similarity() {
        // Same vector = 1.0
        let sim = MemoryStore::cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]);
        assert!((sim - 1.0).abs() < 0.001);

        // Orthogonal vectors = 0.0
        let sim = MemoryStore::cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert!(sim.abs() < 0.001);

        // Opposite vectors = -1.0
        let sim = MemoryStore::cosine_similarity(&[1.0, 0.0, 0.0], &[-1.0, 0.0, 0.0]);
        assert!((sim - (-1.0)).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_length_mismatch_is_zero() {
        let sim = MemoryStore::cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]);
        assert!(sim.abs() < 0.001);
    }

    #[test]
    fn test_token_overlap_counts_distinct_matches() {
        assert_eq!(
            MemoryStore::token_overlap("rust memory", "rust handles memory in rust"),
            2
        );
        assert_eq!(MemoryStore::token_overlap("rust rust", "rust"), 1);
        assert_eq!(MemoryStore::token_overlap("go", "rust only"), 0);
    }
}
