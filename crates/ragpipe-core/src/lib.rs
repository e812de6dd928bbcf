//! # ragpipe-core
//!
//! Core types and traits for the ragpipe retrieval-augmented generation pipeline.
//!
//! This crate provides the foundational abstractions used throughout ragpipe:
//!
//! - **Document Storage**: [`DocumentStore`] trait for indexing and searching chunks
//! - **Embedding Generation**: [`Embedder`] trait for converting text to vector embeddings
//! - **Reranking**: [`Reranker`] trait for re-scoring candidates against a query
//! - **Answer Generation**: [`Generator`] trait for producing grounded answer text
//!
//! ## Architecture
//!
//! The crate is organized around two pipelines that share a store:
//!
//! ```text
//! Blocks -> Chunker -> Embedder -> DocumentStore
//!                                       |
//! Question -> QueryExpander -> HybridRetriever -> RankFuser -> Reranker
//!                                 -> ContextAssembler -> Generator -> Answer
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Block`] | An extracted content block feeding the chunker |
//! | [`Chunk`] | A retrievable unit of content with its embedding |
//! | [`Query`] | A question with its expanded variations |
//! | [`FusedResult`] | A chunk's combined score after rank fusion |
//! | [`Context`] | Citation-indexed chunks rendered for the generator |
//! | [`Answer`] | Final answer text with source attribution |
//!
//! ## Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`DocumentStore`] | Index, store and search chunks |
//! | [`Embedder`] | Generate vector embeddings |
//! | [`Reranker`] | Re-score candidates against a query |
//! | [`Generator`] | Produce answer text from a prompt |
//!
//! ## Example
//!
//! ```rust,ignore
//! use ragpipe_core::{DocumentStore, Embedder, IndexSchema};
//!
//! // Components implement these traits
//! async fn index_chunks(
//!     store: &impl DocumentStore,
//!     embedder: &impl Embedder,
//!     mut chunks: Vec<Chunk>,
//! ) -> Result<(), Error> {
//!     // 1. Create the index sized to the embedder
//!     store
//!         .create_index("docs", IndexSchema::new(embedder.dimension()))
//!         .await?;
//!
//!     // 2. Embed chunk text
//!     let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
//!     let vectors = embedder.embed_batch(&texts).await?;
//!     for (chunk, vector) in chunks.iter_mut().zip(vectors) {
//!         chunk.embedding = Some(vector);
//!     }
//!
//!     // 3. Write and make visible to search
//!     store.upsert_chunks("docs", &chunks).await?;
//!     store.refresh("docs").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! This crate has no optional features.
//!
//! ## Related Crates
//!
//! - `ragpipe-chunker`: Block chunking with overlap windows
//! - `ragpipe-store`: Document store backends (in-memory, Elasticsearch)
//! - `ragpipe-model`: HTTP model adapters (embeddings, reranking, chat)
//! - `ragpipe-index`: Ingestion pipeline coordination
//! - `ragpipe-retrieval`: Query expansion, hybrid retrieval, fusion, answering

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ChunkError, Error, ModelError, Result, StoreError};
pub use traits::*;
pub use types::*;
