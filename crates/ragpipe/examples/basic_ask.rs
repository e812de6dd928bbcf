//! Basic example: answering a question over in-process components.
//!
//! This example runs the full pipeline (ingest -> hybrid search -> fusion ->
//! rerank -> context -> generation) against the in-memory store, with the
//! model seams filled by small local stand-ins. Swap in `ElasticStore`,
//! `ApiEmbedder`, `ApiReranker` and `ChatGenerator` to run the same wiring
//! against real services.
//!
//! Run with:
//! ```bash
//! cargo run --example basic_ask
//! ```

use anyhow::Result;
use async_trait::async_trait;
use ragpipe_core::{
    Block, Chunk, GenerationParams, Generator, ModelError, Reranker, ScoredChunk,
};
use ragpipe_index::{Indexer, IndexerConfig};
use ragpipe_model::NoopEmbedder;
use ragpipe_retrieval::{AnswerPipeline, PipelineConfig};
use ragpipe_store::MemoryStore;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

const INDEX: &str = "manuals";

/// Reranker stand-in that keeps the fused order.
struct KeepOrderReranker;

#[async_trait]
impl Reranker for KeepOrderReranker {
    fn model_name(&self) -> &str {
        "keep-order"
    }

    async fn rerank(
        &self,
        _query: &str,
        chunks: Vec<Chunk>,
        top_n: usize,
    ) -> Result<Vec<ScoredChunk>, ModelError> {
        Ok(chunks
            .into_iter()
            .take(top_n)
            .enumerate()
            .map(|(i, chunk)| ScoredChunk {
                chunk,
                score: 1.0 - 0.05 * i as f32,
            })
            .collect())
    }
}

/// Generator stand-in returning a canned grounded answer.
struct CannedGenerator;

#[async_trait]
impl Generator for CannedGenerator {
    fn model_name(&self) -> &str {
        "canned"
    }

    async fn generate(
        &self,
        _system: &str,
        _user: &str,
        _params: GenerationParams,
    ) -> Result<String, ModelError> {
        Ok(
            "Release the idler tension, slip the old belt off the flywheel, and \
             seat the new one groove by groove [1]."
                .to_string(),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let store = Arc::new(MemoryStore::new());
    let embedder = Arc::new(NoopEmbedder::new());

    // Ingest a small corpus through the real indexer.
    let indexer = Indexer::new(store.clone(), embedder.clone(), IndexerConfig::default())?;
    indexer.create_index(INDEX).await?;

    let compressor = vec![
        Block::text(
            "Air compressor belt replacement: release tension at the idler pulley, \
             slip the belt off the flywheel, and fit the new belt groove by groove.",
            1,
        ),
        Block::text(
            "Drain the receiver tank daily. Condensate left in the tank corrodes \
             the shell from the inside.",
            2,
        ),
    ];
    let chiller = vec![Block::text(
        "Chiller refrigerant charging: connect the manifold gauge to the service \
         port and meter liquid into the high side with the unit off.",
        1,
    )];

    let report = indexer.ingest(INDEX, "compressor.pdf", &compressor).await?;
    info!(
        "Ingested compressor.pdf: {}/{} chunks",
        report.chunks_indexed, report.chunks_total
    );
    let report = indexer.ingest(INDEX, "chiller.pdf", &chiller).await?;
    info!(
        "Ingested chiller.pdf: {}/{} chunks",
        report.chunks_indexed, report.chunks_total
    );

    // Zero-vector embeddings never clear the similarity threshold, so the
    // lexical passes decide the ranking here.
    let mut config = PipelineConfig::default();
    config.retrieval.num_query_variations = 1;

    let pipeline = AnswerPipeline::new(
        store,
        embedder,
        Arc::new(KeepOrderReranker),
        Arc::new(CannedGenerator),
        config,
    );

    let question = "How do I replace the compressor belt?";
    let answer = pipeline.ask(INDEX, question).await?;

    println!("Q: {question}");
    println!("A: {}", answer.text);
    if !answer.sources.is_empty() {
        println!();
        println!("Sources:");
        for source in &answer.sources {
            println!(
                "  [{}] {} p.{} ({}, score {:.3})",
                source.citation, source.source, source.page, source.content_type, source.score
            );
        }
    }

    Ok(())
}
