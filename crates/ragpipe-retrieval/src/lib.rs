//! Query-time retrieval for ragpipe.
//!
//! One question flows through expansion, a concurrent hybrid search fan-out,
//! Reciprocal Rank Fusion, cross-encoder reranking, and context assembly
//! before reaching the generator:
//!
//! ```text
//! question -> QueryExpander -> HybridRetriever -> RankFuser
//!          -> RerankStage -> ContextAssembler -> Generator -> Answer
//! ```
//!
//! # Components
//!
//! - [`QueryExpander`]: Rephrases the question for broader recall
//! - [`HybridRetriever`]: Lexical + vector passes per variation, joined at a barrier
//! - [`RankFuser`]: Scale-invariant merge of all pass rankings
//! - [`RerankStage`]: Precision rescoring with fusion-order fallback
//! - [`ContextAssembler`]: Budgeted rendering with stable citations
//! - [`AnswerPipeline`]: The whole funnel behind one `ask` call

pub mod context;
pub mod expand;
pub mod fusion;
pub mod pipeline;
pub mod rerank;
pub mod retriever;

pub use context::ContextAssembler;
pub use expand::QueryExpander;
pub use fusion::RankFuser;
pub use pipeline::{AnswerPipeline, PipelineConfig};
pub use rerank::RerankStage;
pub use retriever::{HybridRetriever, RetrievalOutcome};
