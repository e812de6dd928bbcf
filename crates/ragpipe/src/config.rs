//! Configuration handling for the ragpipe CLI.
//!
//! Values load from a TOML file where every field is optional; anything
//! absent falls back to the defaults below, so a missing file, an empty file
//! and a partial file all behave sensibly.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use ragpipe_core::{ChunkConfig, GenerationParams};
use ragpipe_index::IndexerConfig;
use ragpipe_retrieval::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Document store connection
    #[serde(default)]
    pub store: StoreConfig,

    /// Embedding service
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Reranking service
    #[serde(default)]
    pub rerank: RerankConfig,

    /// Chat-completion service
    #[serde(default)]
    pub chat: ChatConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Ingestion batching
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Retrieval funnel knobs
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Generation sampling and timeout
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Context assembly budgets
    #[serde(default)]
    pub context: ContextConfig,
}

/// Document store connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the Elasticsearch-compatible server
    #[serde(default = "default_store_url")]
    pub url: String,

    /// Index the chunks live in
    #[serde(default = "default_index")]
    pub index: String,
}

fn default_store_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_index() -> String {
    "ragpipe".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            index: default_index(),
        }
    }
}

/// Embedding service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Full endpoint URL
    #[serde(default = "default_embedding_url")]
    pub url: String,

    /// Model to request
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector dimension the model produces
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

fn default_embedding_url() -> String {
    "http://localhost:8000/v1/embeddings".to_string()
}

fn default_embedding_model() -> String {
    "bge-large-en-v1.5".to_string()
}

fn default_dimension() -> usize {
    1024
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
            model: default_embedding_model(),
            dimension: default_dimension(),
        }
    }
}

/// Reranking service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankConfig {
    /// Full endpoint URL
    #[serde(default = "default_rerank_url")]
    pub url: String,

    /// Model to request
    #[serde(default = "default_rerank_model")]
    pub model: String,
}

fn default_rerank_url() -> String {
    "http://localhost:8001/rerank".to_string()
}

fn default_rerank_model() -> String {
    "bge-reranker-v2-m3".to_string()
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            url: default_rerank_url(),
            model: default_rerank_model(),
        }
    }
}

/// Chat-completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Base URL, `/chat/completions` is appended
    #[serde(default = "default_chat_base_url")]
    pub base_url: String,

    /// Model to request
    #[serde(default = "default_chat_model")]
    pub model: String,
}

fn default_chat_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: default_chat_base_url(),
            model: default_chat_model(),
        }
    }
}

/// Chunking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_chunk_size() -> usize {
    1024
}

fn default_chunk_overlap() -> usize {
    100
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Ingestion batching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Chunks per embedding call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Batches allowed in flight at once
    #[serde(default = "default_max_concurrent_batches")]
    pub max_concurrent_batches: usize,
}

fn default_batch_size() -> usize {
    25
}

fn default_max_concurrent_batches() -> usize {
    4
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_concurrent_batches: default_max_concurrent_batches(),
        }
    }
}

/// Retrieval funnel knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Candidates fetched per modality per query variation
    #[serde(default = "default_max_results_per_query")]
    pub max_results_per_query: usize,

    /// Rank-damping constant of Reciprocal Rank Fusion
    #[serde(default = "default_rrf_k")]
    pub rrf_k: u32,

    /// Total query variations including the raw question
    #[serde(default = "default_num_query_variations")]
    pub num_query_variations: usize,

    /// Minimum cosine similarity for vector hits
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Fused candidates forwarded to the reranker
    #[serde(default = "default_top_k_rerank")]
    pub top_k_rerank: usize,

    /// Final result count after reranking
    #[serde(default = "default_final_top_k")]
    pub final_top_k: usize,

    /// Per-pass timeout in milliseconds
    #[serde(default = "default_pass_timeout_ms")]
    pub pass_timeout_ms: u64,
}

fn default_max_results_per_query() -> usize {
    20
}

fn default_rrf_k() -> u32 {
    60
}

fn default_num_query_variations() -> usize {
    3
}

fn default_similarity_threshold() -> f32 {
    0.8
}

fn default_top_k_rerank() -> usize {
    50
}

fn default_final_top_k() -> usize {
    10
}

fn default_pass_timeout_ms() -> u64 {
    15_000
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_results_per_query: default_max_results_per_query(),
            rrf_k: default_rrf_k(),
            num_query_variations: default_num_query_variations(),
            similarity_threshold: default_similarity_threshold(),
            top_k_rerank: default_top_k_rerank(),
            final_top_k: default_final_top_k(),
            pass_timeout_ms: default_pass_timeout_ms(),
        }
    }
}

/// Generation sampling and timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Timeout for the generation call in milliseconds
    #[serde(default = "default_generation_timeout_ms")]
    pub generation_timeout_ms: u64,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_generation_timeout_ms() -> u64 {
    60_000
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            generation_timeout_ms: default_generation_timeout_ms(),
        }
    }
}

/// Context assembly budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Character cap per rendered chunk
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Character cap for the whole rendered context
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

fn default_max_chunk_chars() -> usize {
    300
}

fn default_max_context_chars() -> usize {
    4000
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

impl Config {
    /// Load from the default config path; absent file means all defaults.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load from an explicit path. Unlike [`Config::load`], a missing file
    /// here is an error, so a typoed `--config` does not silently fall back
    /// to defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Default config file path, if the platform exposes a config directory.
    pub fn config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Sample configuration file with every default spelled out.
    #[must_use]
    pub fn sample_toml() -> String {
        let defaults = Self::default();
        format!(
            r#"# ragpipe configuration. Every key is optional; these are the defaults.

[store]
url = "{store_url}"
index = "{index}"

[embedding]
url = "{embed_url}"
model = "{embed_model}"
dimension = {dimension}

[rerank]
url = "{rerank_url}"
model = "{rerank_model}"

[chat]
base_url = "{chat_url}"
model = "{chat_model}"

[chunking]
chunk_size = {chunk_size}
chunk_overlap = {chunk_overlap}

[indexing]
batch_size = {batch_size}
max_concurrent_batches = {max_concurrent}

[retrieval]
max_results_per_query = {max_results}
rrf_k = {rrf_k}
num_query_variations = {variations}
similarity_threshold = {threshold}
top_k_rerank = {top_k_rerank}
final_top_k = {final_top_k}
pass_timeout_ms = {pass_timeout}

[generation]
temperature = {temperature}
max_tokens = {max_tokens}
generation_timeout_ms = {generation_timeout}

[context]
max_chunk_chars = {max_chunk_chars}
max_context_chars = {max_context_chars}
"#,
            store_url = defaults.store.url,
            index = defaults.store.index,
            embed_url = defaults.embedding.url,
            embed_model = defaults.embedding.model,
            dimension = defaults.embedding.dimension,
            rerank_url = defaults.rerank.url,
            rerank_model = defaults.rerank.model,
            chat_url = defaults.chat.base_url,
            chat_model = defaults.chat.model,
            chunk_size = defaults.chunking.chunk_size,
            chunk_overlap = defaults.chunking.chunk_overlap,
            batch_size = defaults.indexing.batch_size,
            max_concurrent = defaults.indexing.max_concurrent_batches,
            max_results = defaults.retrieval.max_results_per_query,
            rrf_k = defaults.retrieval.rrf_k,
            variations = defaults.retrieval.num_query_variations,
            threshold = defaults.retrieval.similarity_threshold,
            top_k_rerank = defaults.retrieval.top_k_rerank,
            final_top_k = defaults.retrieval.final_top_k,
            pass_timeout = defaults.retrieval.pass_timeout_ms,
            temperature = defaults.generation.temperature,
            max_tokens = defaults.generation.max_tokens,
            generation_timeout = defaults.generation.generation_timeout_ms,
            max_chunk_chars = defaults.context.max_chunk_chars,
            max_context_chars = defaults.context.max_context_chars,
        )
    }

    /// Ingestion configuration as the indexer consumes it.
    #[must_use]
    pub fn indexer_config(&self) -> IndexerConfig {
        IndexerConfig {
            chunk_config: ChunkConfig {
                chunk_size: self.chunking.chunk_size,
                chunk_overlap: self.chunking.chunk_overlap,
            },
            batch_size: self.indexing.batch_size,
            max_concurrent_batches: self.indexing.max_concurrent_batches,
        }
    }

    /// Pipeline configuration as the answer pipeline consumes it.
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            retrieval: ragpipe_core::RetrievalConfig {
                max_results_per_query: self.retrieval.max_results_per_query,
                rrf_k: self.retrieval.rrf_k,
                num_query_variations: self.retrieval.num_query_variations,
                similarity_threshold: Some(self.retrieval.similarity_threshold),
                top_k_rerank: self.retrieval.top_k_rerank,
                final_top_k: self.retrieval.final_top_k,
                pass_timeout_ms: self.retrieval.pass_timeout_ms,
            },
            context: ragpipe_core::ContextConfig {
                max_chunk_chars: self.context.max_chunk_chars,
                max_context_chars: self.context.max_context_chars,
            },
            generation: GenerationParams {
                temperature: self.generation.temperature,
                max_tokens: self.generation.max_tokens,
            },
            generation_timeout_ms: self.generation.generation_timeout_ms,
        }
    }
}

/// Config directory for ragpipe (XDG on Linux).
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("RAGPIPE_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", "ragpipe").map(|dirs| dirs.config_dir().to_path_buf())
}
