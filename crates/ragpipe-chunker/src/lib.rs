//! Block chunking for ragpipe ingestion.

pub mod block;

pub use block::BlockChunker;
