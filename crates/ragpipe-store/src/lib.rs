//! Document storage layer for ragpipe.
//!
//! This crate provides the storage backends for ragpipe, implementing the
//! [`DocumentStore`](ragpipe_core::DocumentStore) trait over Elasticsearch
//! for production use and over process memory for tests and development.
//!
//! # Features
//!
//! - **Hybrid search**: Full-text match and kNN vector search per index
//! - **Schema checks**: Idempotent index creation with dimension conflicts
//!   surfaced instead of silently reusing a mismatched index
//! - **Threshold filtering**: Vector hits below a cosine similarity floor
//!   are dropped before ranking
//!
//! # Example
//!
//! ```rust,ignore
//! use ragpipe_store::ElasticStore;
//! use ragpipe_core::{DocumentStore, IndexSchema};
//!
//! // Create the index and write chunks
//! let store = ElasticStore::new("http://localhost:9200");
//! store.create_index("docs", IndexSchema::new(1024)).await?;
//! store.upsert_chunks("docs", &chunks).await?;
//! store.refresh("docs").await?;
//!
//! // Search
//! let hits = store.search_lexical("docs", "quarterly revenue", 20).await?;
//! ```

pub mod elastic;
pub mod memory;
pub mod schema;

pub use elastic::ElasticStore;
pub use memory::MemoryStore;
