//! Core traits for ragpipe components.
//!
//! This module defines the trait interfaces at the pipeline's external seams:
//!
//! - [`DocumentStore`]: Index, store and search chunks
//! - [`Embedder`]: Generate vector embeddings
//! - [`Reranker`]: Re-score candidates against a query
//! - [`Generator`]: Produce answer text from a prompt
//!
//! Everything that talks to another process lives behind one of these traits,
//! so backends can be swapped without changing the rest of the system and
//! tests can run against in-process fakes.

use async_trait::async_trait;

use crate::error::{ModelError, StoreError};
use crate::types::{
    Chunk, GenerationParams, IndexCreation, IndexSchema, IndexStats, ScoredChunk,
};

// ============================================================================
// Document Storage
// ============================================================================

/// Trait for chunk storage and search.
///
/// One store holds many named indexes. All operations are index-scoped and
/// none of them require the caller to hold locks; implementations provide
/// their own interior synchronization.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create an index with the given schema. Idempotent: if the index
    /// already exists with a compatible schema this returns
    /// [`IndexCreation::AlreadyExists`]; an incompatible schema is an error.
    async fn create_index(
        &self,
        index: &str,
        schema: IndexSchema,
    ) -> Result<IndexCreation, StoreError>;

    /// Check whether an index exists.
    async fn index_exists(&self, index: &str) -> Result<bool, StoreError>;

    /// Delete an index and everything in it. Returns `false` when the index
    /// did not exist.
    async fn delete_index(&self, index: &str) -> Result<bool, StoreError>;

    /// Insert or overwrite chunks keyed by chunk id. Every chunk must carry
    /// an embedding of the index's dimension.
    async fn upsert_chunks(&self, index: &str, chunks: &[Chunk]) -> Result<(), StoreError>;

    /// Make prior writes visible to search.
    async fn refresh(&self, index: &str) -> Result<(), StoreError>;

    /// Full-text relevance search over chunk text.
    async fn search_lexical(
        &self,
        index: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError>;

    /// K-nearest-neighbor search by cosine similarity. Hits scoring below
    /// `threshold` are dropped before ranking when one is given.
    async fn search_vector(
        &self,
        index: &str,
        vector: &[f32],
        limit: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<ScoredChunk>, StoreError>;

    /// Get document count and size of an index.
    async fn stats(&self, index: &str) -> Result<IndexStats, StoreError>;
}

// ============================================================================
// Embedding
// ============================================================================

/// Trait for generating embeddings.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model name/identifier.
    fn model_name(&self) -> &str;

    /// Embedding dimension.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts. Returns one vector per input, in order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ModelError>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        let mut results = self.embed_batch(&[text]).await?;
        if results.len() != 1 {
            return Err(ModelError::Response(format!(
                "expected 1 embedding, got {}",
                results.len()
            )));
        }
        Ok(results.remove(0))
    }
}

// ============================================================================
// Reranking
// ============================================================================

/// Trait for re-scoring candidates against a query.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Model name/identifier.
    fn model_name(&self) -> &str;

    /// Score each chunk's relevance to the query and return the best
    /// `top_n`, sorted by descending score. Input order carries no signal.
    async fn rerank(
        &self,
        query: &str,
        chunks: Vec<Chunk>,
        top_n: usize,
    ) -> Result<Vec<ScoredChunk>, ModelError>;
}

// ============================================================================
// Generation
// ============================================================================

/// Trait for producing answer text from a prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Model name/identifier.
    fn model_name(&self) -> &str;

    /// Generate a completion for the given system and user prompts.
    async fn generate(
        &self,
        system: &str,
        user: &str,
        params: GenerationParams,
    ) -> Result<String, ModelError>;
}
