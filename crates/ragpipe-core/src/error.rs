//! Error types for the ragpipe pipeline.

use thiserror::Error;

/// Main error type for pipeline operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Document store operation failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Model service call failed
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Chunking failed
    #[error("chunking error: {0}")]
    Chunking(#[from] ChunkError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation aborted by timeout or caller cancellation
    #[error("cancelled during {stage}")]
    Cancelled { stage: &'static str },

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

/// Document store errors.
///
/// `Connection` and `SchemaConflict` are fatal to the request that hits
/// them; everything else is recoverable at the call site where noted.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Connection(String),

    #[error("index '{index}' exists with vector dimension {actual}, expected {expected}")]
    SchemaConflict {
        index: String,
        expected: usize,
        actual: usize,
    },

    #[error("embedding dimension mismatch for chunk '{chunk_id}': expected {expected}, got {actual}")]
    DimensionMismatch {
        chunk_id: String,
        expected: usize,
        actual: usize,
    },

    #[error("chunk '{0}' has no embedding")]
    MissingEmbedding(String),

    #[error("index not found: {0}")]
    IndexNotFound(String),

    #[error("store returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unexpected store response: {0}")]
    Response(String),
}

/// Model service errors, shared by the embedding, reranking and
/// generation adapters.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model service unreachable: {0}")]
    Connection(String),

    #[error("model service returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unexpected model response: {0}")]
    Response(String),
}

/// Chunking errors.
#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("no chunkable content in source '{0}'")]
    EmptySource(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for errors that must abort the whole request rather than
    /// degrade it (store unreachable, incompatible index schema).
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Store(StoreError::Connection(_)) | Error::Store(StoreError::SchemaConflict { .. })
        )
    }
}
