//! # ragpipe-model
//!
//! HTTP adapters for the external model services ragpipe depends on.
//!
//! Each adapter implements one of the model traits from `ragpipe-core` over
//! a JSON HTTP endpoint. All three services are stateless from the
//! pipeline's point of view; the adapters carry no caches and no retries,
//! leaving failure policy to the pipeline stages that call them.
//!
//! ## Components
//!
//! | Type | Trait | Endpoint shape |
//! |------|-------|----------------|
//! | [`ApiEmbedder`] | `Embedder` | OpenAI-compatible `/v1/embeddings` |
//! | [`ApiReranker`] | `Reranker` | Cross-encoder `/rerank` |
//! | [`ChatGenerator`] | `Generator` | OpenAI-compatible `/chat/completions` |
//! | [`EmbedderPool`] | `Embedder` | Wraps any embedder with a concurrency cap |
//! | [`NoopEmbedder`] | `Embedder` | Zero-vectors, no I/O |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ragpipe_model::{ApiEmbedder, EmbedderPool};
//! use ragpipe_core::Embedder;
//! use std::sync::Arc;
//!
//! let embedder = ApiEmbedder::new(
//!     "http://localhost:8000/v1/embeddings",
//!     "bge-large-en-v1.5",
//!     1024,
//! );
//!
//! // Cap concurrent calls during ingestion
//! let pool = EmbedderPool::new(Arc::new(embedder), 4);
//! let vectors = pool.embed_batch(&["Hello world"]).await?;
//! ```

pub mod chat;
pub mod embedding;
pub mod noop;
pub mod pool;
pub mod rerank;

pub use chat::ChatGenerator;
pub use embedding::ApiEmbedder;
pub use noop::NoopEmbedder;
pub use pool::EmbedderPool;
pub use rerank::ApiReranker;
