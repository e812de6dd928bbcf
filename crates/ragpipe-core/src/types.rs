//! Core types for the ragpipe pipeline.
//!
//! This module contains all shared data structures used across ragpipe:
//!
//! ## Ingestion
//! - [`Block`]: An extracted content block feeding the chunker
//! - [`Chunk`]: The atomic retrievable unit with its embedding
//! - [`ContentType`]: Provenance tag for chunk content
//! - [`ChunkConfig`]: Configuration for chunking behavior
//! - [`IngestReport`]: Summary of one ingestion run
//!
//! ## Index lifecycle
//! - [`IndexSchema`]: Field schema for a store index
//! - [`IndexCreation`]: Outcome of an idempotent index creation
//! - [`IndexStats`]: Document count and size of an index
//!
//! ## Retrieval
//! - [`Query`]: A user question plus its expanded variations
//! - [`RankedCandidate`]: One hit of one retrieval pass
//! - [`FusedResult`]: A chunk's combined score after rank fusion
//! - [`ScoredChunk`]: A chunk paired with a relevance score
//! - [`RetrievalConfig`]: Knobs for the hybrid retrieval funnel
//!
//! ## Answering
//! - [`Context`]: Citation-indexed chunks rendered for the generator
//! - [`ContextConfig`]: Per-chunk and total context budgets
//! - [`GenerationParams`]: Sampling parameters for the generator
//! - [`Answer`]: Final answer text with source attribution

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Content
// ============================================================================

/// Provenance tag for chunk content.
///
/// Image captions and linearized tables are stored as plain text; this tag
/// records what the text originally was. It is set at extraction time and
/// never inferred later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Running document text
    Text,
    /// Caption describing an embedded image
    Image,
    /// Linearized table rows
    Table,
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ContentType::Text => "text",
            ContentType::Image => "image",
            ContentType::Table => "table",
        };
        f.write_str(s)
    }
}

/// An extracted content block, the input unit of the chunker.
///
/// Extraction adapters produce one `Block` per text region, image caption
/// or table. Page 0 means the source is not paginated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Extracted text (raw text, a caption, or linearized table rows)
    pub text: String,
    /// What the text originally was
    pub content_type: ContentType,
    /// 1-based page within the source, 0 if unpaginated
    #[serde(default)]
    pub page: u32,
}

impl Block {
    /// Create a text block.
    #[must_use]
    pub fn text(text: impl Into<String>, page: u32) -> Self {
        Self {
            text: text.into(),
            content_type: ContentType::Text,
            page,
        }
    }
}

/// The atomic retrievable unit.
///
/// Serializes to exactly the document shape the store indexes: `chunk_id`,
/// `text`, `embedding`, `source`, `page`, `content_type`. Chunks are written
/// once at ingestion and immutable afterwards; re-ingesting the same source
/// overwrites them under the same ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic id, stable across re-ingestion of the same input
    #[serde(rename = "chunk_id")]
    pub id: String,
    /// The unit's textual content
    pub text: String,
    /// Dense vector, attached at ingestion; absent on search hits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Originating document (filename or logical source key)
    pub source: String,
    /// Page within the source, 0 if unpaginated
    pub page: u32,
    /// Provenance tag
    pub content_type: ContentType,
}

/// Configuration for chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum chunk length in characters (word-boundary aligned)
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 100,
        }
    }
}

// ============================================================================
// Index lifecycle
// ============================================================================

/// Field schema for a store index.
///
/// The field set is fixed (`text`, `embedding`, `source`, `page`,
/// `content_type`, `chunk_id`); only the vector dimension varies per index.
/// Similarity is always cosine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    /// Dimension of the `embedding` dense vector field
    pub vector_dims: usize,
    /// Number of primary shards
    pub shards: u32,
    /// Number of replicas
    pub replicas: u32,
}

impl IndexSchema {
    /// Schema with the given vector dimension and single-node defaults.
    #[must_use]
    pub fn new(vector_dims: usize) -> Self {
        Self {
            vector_dims,
            shards: 1,
            replicas: 0,
        }
    }
}

/// Outcome of an idempotent index creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexCreation {
    /// The index did not exist and was created
    Created,
    /// A compatible index already existed; nothing was modified
    AlreadyExists,
}

/// Document count and on-disk size of an index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of indexed documents
    pub doc_count: u64,
    /// Index size in bytes
    pub size_bytes: u64,
    /// Last write time, if the backend tracks it
    pub last_updated: Option<DateTime<Utc>>,
}

/// Summary of one ingestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestReport {
    /// Chunks produced by the chunker
    pub chunks_total: usize,
    /// Chunks embedded and written
    pub chunks_indexed: usize,
    /// Chunks dropped after embedding failures
    pub chunks_skipped: usize,
    /// Number of batches processed
    pub batches: usize,
}

// ============================================================================
// Retrieval
// ============================================================================

/// A user question plus its expanded variations.
///
/// `variations[0]` is always the raw question, so retrieval degrades to
/// single-query search whenever expansion fails or is disabled.
#[derive(Debug, Clone)]
pub struct Query {
    /// The question as the user asked it
    pub raw: String,
    /// Ordered rephrasings, raw question first
    pub variations: Vec<String>,
}

impl Query {
    /// Query with no expansion.
    #[must_use]
    pub fn single(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let variations = vec![raw.clone()];
        Self { raw, variations }
    }

    /// Query with generated rephrasings appended after the raw question.
    #[must_use]
    pub fn with_variations(raw: impl Into<String>, rephrasings: Vec<String>) -> Self {
        let raw = raw.into();
        let mut variations = Vec::with_capacity(rephrasings.len() + 1);
        variations.push(raw.clone());
        variations.extend(rephrasings);
        Self { raw, variations }
    }
}

/// One hit of one retrieval pass.
///
/// `raw_score` is the engine-native relevance score and is not comparable
/// across passes; fusion uses only `rank`.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    /// Id of the matched chunk
    pub chunk_id: String,
    /// 1-based position within the pass's result list
    pub rank: usize,
    /// Engine-native score, for diagnostics only
    pub raw_score: f32,
}

/// A chunk's combined score after Reciprocal Rank Fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedResult {
    /// Id of the fused chunk
    pub chunk_id: String,
    /// Sum of reciprocal-rank contributions across passes
    pub fusion_score: f64,
    /// Number of passes the chunk appeared in
    pub appearance_count: usize,
}

/// A chunk paired with a relevance score (store hit or rerank output).
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Knobs for the hybrid retrieval funnel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Candidates fetched per modality per query variation
    pub max_results_per_query: usize,
    /// Rank-damping constant of Reciprocal Rank Fusion
    pub rrf_k: u32,
    /// Total query variations including the raw question
    pub num_query_variations: usize,
    /// Vector hits below this cosine similarity are discarded before ranking
    pub similarity_threshold: Option<f32>,
    /// Fused candidates forwarded to the reranker
    pub top_k_rerank: usize,
    /// Final result count after reranking
    pub final_top_k: usize,
    /// Per-pass timeout in milliseconds
    pub pass_timeout_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_results_per_query: 20,
            rrf_k: 60,
            num_query_variations: 3,
            similarity_threshold: Some(0.8),
            top_k_rerank: 50,
            final_top_k: 10,
            pass_timeout_ms: 15_000,
        }
    }
}

// ============================================================================
// Answering
// ============================================================================

/// One citation-indexed chunk inside an assembled context.
#[derive(Debug, Clone)]
pub struct ContextEntry {
    /// 1-based citation index, fixed for the life of one request
    pub citation: usize,
    /// The cited chunk
    pub chunk: Chunk,
}

/// Citation-indexed chunks rendered for the generator.
///
/// Entries are ordered by descending relevance. Citation indices are
/// assigned before budgeting and never change afterwards, so the numbers a
/// generated answer cites always resolve to the right chunk.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Surviving entries in rank order
    pub entries: Vec<ContextEntry>,
    /// Prompt-ready rendering of all entries
    pub rendered: String,
}

impl Context {
    /// True when no chunk survived assembly.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-chunk and total context budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Character cap per rendered chunk
    pub max_chunk_chars: usize,
    /// Character cap for the whole rendered context
    pub max_context_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 300,
            max_context_chars: 4000,
        }
    }
}

/// Sampling parameters for the generator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2000,
        }
    }
}

/// Source attribution for one cited chunk of an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    /// Citation index as rendered in the context
    pub citation: usize,
    /// Id of the cited chunk
    pub chunk_id: String,
    /// Originating document
    pub source: String,
    /// Page within the source
    pub page: u32,
    /// Provenance tag
    pub content_type: ContentType,
    /// Relevance score the chunk entered the context with
    pub score: f32,
}

/// Final answer text with source attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Generated answer, or the fixed not-found text
    pub text: String,
    /// Chunks the answer was grounded on, in citation order
    pub sources: Vec<SourceRef>,
    /// False when retrieval produced nothing and generation was bypassed
    pub found: bool,
}

impl Answer {
    /// The well-defined "nothing retrieved" answer. Not an error.
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            text: "No relevant information was found in the indexed documents.".to_string(),
            sources: Vec::new(),
            found: false,
        }
    }
}
