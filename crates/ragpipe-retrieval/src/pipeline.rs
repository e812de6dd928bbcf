//! End-to-end question answering.

use std::sync::Arc;
use std::time::Duration;

use ragpipe_core::{
    Answer, ContextConfig, DocumentStore, Embedder, Error, GenerationParams, Generator, Query,
    Reranker, Result, RetrievalConfig, SourceRef,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::context::ContextAssembler;
use crate::expand::QueryExpander;
use crate::fusion::RankFuser;
use crate::rerank::RerankStage;
use crate::retriever::HybridRetriever;

/// Instruction prompt for grounded generation.
const SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer using only the \
    provided reference documents, and cite the supporting document for every \
    factual claim with its bracketed number, like [1]. If the documents do not \
    contain the answer, say so explicitly.";

/// Tunables for one [`AnswerPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Retrieval funnel knobs
    pub retrieval: RetrievalConfig,
    /// Context rendering budget
    pub context: ContextConfig,
    /// Sampling parameters for answer generation
    pub generation: GenerationParams,
    /// Upper bound on one generation call, in milliseconds
    pub generation_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retrieval: RetrievalConfig::default(),
            context: ContextConfig::default(),
            generation: GenerationParams::default(),
            generation_timeout_ms: 60_000,
        }
    }
}

/// The full question-answering funnel: expansion, hybrid retrieval, rank
/// fusion, reranking, context assembly, grounded generation.
pub struct AnswerPipeline {
    expander: QueryExpander,
    retriever: HybridRetriever,
    fuser: RankFuser,
    rerank: RerankStage,
    assembler: ContextAssembler,
    generator: Arc<dyn Generator>,
    config: PipelineConfig,
}

impl AnswerPipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn Embedder>,
        reranker: Arc<dyn Reranker>,
        generator: Arc<dyn Generator>,
        config: PipelineConfig,
    ) -> Self {
        let retrieval = config.retrieval.clone();
        Self {
            expander: QueryExpander::new(Arc::clone(&generator)),
            retriever: HybridRetriever::new(store, embedder, retrieval.clone()),
            fuser: RankFuser::new(retrieval.rrf_k),
            rerank: RerankStage::new(
                reranker,
                retrieval.top_k_rerank,
                retrieval.final_top_k,
                Duration::from_millis(retrieval.pass_timeout_ms),
            ),
            assembler: ContextAssembler::new(config.context.clone()),
            generator,
            config,
        }
    }

    /// Answer `question` from the documents in `index`.
    ///
    /// Retrieving nothing is not an error: the returned [`Answer`] carries
    /// `found = false` and a fixed text, and generation is bypassed. Only
    /// requests where every retrieval pass failed, or where generation
    /// itself failed or timed out, surface an error.
    pub async fn ask(&self, index: &str, question: &str) -> Result<Answer> {
        let request_id = Uuid::new_v4();
        info!("[{}] Question: {}", request_id, question);

        // Expansion shares the per-pass timeout; a stalled model service
        // degrades to the raw question instead of blocking retrieval.
        let expansion = self
            .expander
            .expand(question, self.config.retrieval.num_query_variations);
        let pass_deadline = Duration::from_millis(self.config.retrieval.pass_timeout_ms);
        let query = match tokio::time::timeout(pass_deadline, expansion).await {
            Ok(query) => query,
            Err(_) => {
                warn!("[{}] Query expansion timed out", request_id);
                Query::single(question)
            }
        };
        debug!(
            "[{}] {} query variations",
            request_id,
            query.variations.len()
        );

        let outcome = self.retriever.run(index, &query).await;
        info!(
            "[{}] Retrieval: {}/{} passes succeeded, {} unique chunks",
            request_id,
            outcome.passes.len(),
            outcome.total_passes,
            outcome.chunks.len()
        );
        if outcome.passes.is_empty() {
            return Err(outcome
                .first_error
                .unwrap_or(Error::Cancelled { stage: "retrieval" }));
        }

        let fused = self.fuser.fuse(&outcome.passes);
        if fused.is_empty() {
            info!("[{}] Nothing retrieved, answering not-found", request_id);
            return Ok(Answer::not_found());
        }
        debug!("[{}] {} fused candidates", request_id, fused.len());

        let ranked = self.rerank.rerank(question, &fused, &outcome.chunks).await;

        let context = self.assembler.assemble(&ranked);
        if context.is_empty() {
            info!("[{}] Context empty after budgeting", request_id);
            return Ok(Answer::not_found());
        }
        debug!(
            "[{}] Context: {} entries, {} chars",
            request_id,
            context.entries.len(),
            context.rendered.chars().count()
        );

        let user_prompt = format!(
            "Question: {}\n\nReference documents:\n{}\n\nAnswer:",
            question, context.rendered
        );
        let generation = self
            .generator
            .generate(SYSTEM_PROMPT, &user_prompt, self.config.generation);
        let deadline = Duration::from_millis(self.config.generation_timeout_ms);
        let text = match tokio::time::timeout(deadline, generation).await {
            Ok(result) => result?,
            Err(_) => return Err(Error::Cancelled { stage: "generation" }),
        };
        info!(
            "[{}] Answer generated ({} chars, {} sources)",
            request_id,
            text.chars().count(),
            context.entries.len()
        );

        let sources = context
            .entries
            .iter()
            .map(|entry| SourceRef {
                citation: entry.citation,
                chunk_id: entry.chunk.id.clone(),
                source: entry.chunk.source.clone(),
                page: entry.chunk.page,
                content_type: entry.chunk.content_type,
                score: ranked
                    .get(entry.citation - 1)
                    .map_or(0.0, |scored| scored.score),
            })
            .collect();

        Ok(Answer {
            text,
            sources,
            found: true,
        })
    }
}
