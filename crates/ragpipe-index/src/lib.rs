//! Ingestion pipeline for ragpipe.
//!
//! This crate turns extracted document blocks into searchable chunks:
//! chunking -> batched embedding -> upsert -> refresh.
//!
//! # Components
//!
//! - [`Indexer`]: Service that coordinates the ingestion pipeline
//! - [`IndexerConfig`]: Batching and chunking configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use ragpipe_index::{Indexer, IndexerConfig};
//!
//! let indexer = Indexer::new(store, embedder, IndexerConfig::default())?;
//!
//! indexer.create_index("docs").await?;
//! let report = indexer.ingest("docs", "manual.pdf", &blocks).await?;
//! println!("indexed {}/{} chunks", report.chunks_indexed, report.chunks_total);
//! ```

pub mod indexer;

pub use indexer::{Indexer, IndexerConfig};
