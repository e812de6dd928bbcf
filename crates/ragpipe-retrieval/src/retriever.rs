//! Hybrid search fan-out across query variations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ragpipe_core::{
    Chunk, DocumentStore, Embedder, Error, Query, RankedCandidate, Result, RetrievalConfig,
    ScoredChunk,
};
use tracing::{debug, warn};

/// Search modality of one retrieval pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modality {
    Lexical,
    Vector,
}

impl Modality {
    fn label(self) -> &'static str {
        match self {
            Modality::Lexical => "lexical",
            Modality::Vector => "vector",
        }
    }
}

/// Everything the retrieval fan-out produced for one query.
#[derive(Debug, Default)]
pub struct RetrievalOutcome {
    /// Ranked candidates of each completed pass
    pub passes: Vec<Vec<RankedCandidate>>,
    /// Every chunk seen in any pass, by id
    pub chunks: HashMap<String, Chunk>,
    /// Passes that failed or timed out
    pub failed_passes: usize,
    /// Passes attempted
    pub total_passes: usize,
    /// Error of the earliest failed pass, surfaced when nothing succeeds
    pub first_error: Option<Error>,
}

/// Scatter/gather retrieval: one lexical and one vector pass per query
/// variation, all concurrent, joined at a barrier.
///
/// Individual pass failures are counted and logged, never fatal; the fuser
/// works with whatever passes completed.
#[derive(Clone)]
pub struct HybridRetriever {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
    config: RetrievalConfig,
}

impl HybridRetriever {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn Embedder>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Run every (variation, modality) pass against `index` and gather the
    /// survivors. Ranks are 1-based within each pass.
    pub async fn run(&self, index: &str, query: &Query) -> RetrievalOutcome {
        let mut handles = Vec::new();
        for (variation_no, variation) in query.variations.iter().enumerate() {
            for modality in [Modality::Lexical, Modality::Vector] {
                let retriever = self.clone();
                let index = index.to_string();
                let text = variation.clone();
                let raw = query.raw.clone();
                handles.push(tokio::spawn(async move {
                    retriever
                        .run_pass(&index, variation_no, &text, &raw, modality)
                        .await
                }));
            }
        }

        let mut outcome = RetrievalOutcome {
            total_passes: handles.len(),
            ..RetrievalOutcome::default()
        };
        for handle in handles {
            match handle.await {
                Ok(Ok(hits)) => {
                    let mut pass = Vec::with_capacity(hits.len());
                    for (i, hit) in hits.into_iter().enumerate() {
                        let ScoredChunk { chunk, score } = hit;
                        pass.push(RankedCandidate {
                            chunk_id: chunk.id.clone(),
                            rank: i + 1,
                            raw_score: score,
                        });
                        outcome.chunks.entry(chunk.id.clone()).or_insert(chunk);
                    }
                    outcome.passes.push(pass);
                }
                Ok(Err(e)) => {
                    outcome.failed_passes += 1;
                    if outcome.first_error.is_none() {
                        outcome.first_error = Some(e);
                    }
                }
                Err(e) => {
                    warn!("Retrieval pass task failed: {}", e);
                    outcome.failed_passes += 1;
                    if outcome.first_error.is_none() {
                        outcome.first_error = Some(Error::Cancelled { stage: "retrieval" });
                    }
                }
            }
        }

        debug!(
            "Retrieval finished: {}/{} passes, {} unique chunks",
            outcome.passes.len(),
            outcome.total_passes,
            outcome.chunks.len()
        );
        outcome
    }

    /// Run one search pass under the configured timeout.
    async fn run_pass(
        &self,
        index: &str,
        variation_no: usize,
        text: &str,
        raw: &str,
        modality: Modality,
    ) -> Result<Vec<ScoredChunk>> {
        let deadline = Duration::from_millis(self.config.pass_timeout_ms);
        let search = self.search_once(index, variation_no, text, raw, modality);
        match tokio::time::timeout(deadline, search).await {
            Ok(Ok(hits)) => {
                debug!(
                    "{} pass for variation {} returned {} hits",
                    modality.label(),
                    variation_no,
                    hits.len()
                );
                Ok(hits)
            }
            Ok(Err(e)) => {
                warn!(
                    "{} pass for variation {} failed: {}",
                    modality.label(),
                    variation_no,
                    e
                );
                Err(e)
            }
            Err(_) => {
                warn!(
                    "{} pass for variation {} timed out after {:?}",
                    modality.label(),
                    variation_no,
                    deadline
                );
                Err(Error::Cancelled { stage: "retrieval" })
            }
        }
    }

    /// One search call. Vector passes embed the variation text; a failed
    /// embed of a generated variation retries with the raw query before
    /// giving up.
    async fn search_once(
        &self,
        index: &str,
        variation_no: usize,
        text: &str,
        raw: &str,
        modality: Modality,
    ) -> Result<Vec<ScoredChunk>> {
        match modality {
            Modality::Lexical => Ok(self
                .store
                .search_lexical(index, text, self.config.max_results_per_query)
                .await?),
            Modality::Vector => {
                let vector = match self.embedder.embed(text).await {
                    Ok(vector) => vector,
                    Err(e) if variation_no > 0 => {
                        warn!(
                            "Embedding variation {} failed ({}), retrying with the raw query",
                            variation_no, e
                        );
                        self.embedder.embed(raw).await.map_err(Error::Model)?
                    }
                    Err(e) => return Err(Error::Model(e)),
                };
                Ok(self
                    .store
                    .search_vector(
                        index,
                        &vector,
                        self.config.max_results_per_query,
                        self.config.similarity_threshold,
                    )
                    .await?)
            }
        }
    }
}
