//! Precision reranking over the fused candidate list.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ragpipe_core::{Chunk, FusedResult, Reranker, ScoredChunk};
use tracing::{debug, warn};

/// Second-stage reranking with graceful fallback.
///
/// The cross-encoder scores the top fused candidates against the raw query,
/// never a variation, so expansion drift cannot leak into the final ranking.
/// A failed or timed-out rerank call falls back to fusion order.
pub struct RerankStage {
    reranker: Arc<dyn Reranker>,
    top_k_rerank: usize,
    final_top_k: usize,
    timeout: Duration,
}

impl RerankStage {
    pub fn new(
        reranker: Arc<dyn Reranker>,
        top_k_rerank: usize,
        final_top_k: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            reranker,
            top_k_rerank,
            final_top_k,
            timeout,
        }
    }

    /// Rerank the top fused candidates and return the final ranked chunks.
    pub async fn rerank(
        &self,
        raw_query: &str,
        fused: &[FusedResult],
        chunks: &HashMap<String, Chunk>,
    ) -> Vec<ScoredChunk> {
        let head: Vec<Chunk> = fused
            .iter()
            .take(self.top_k_rerank)
            .filter_map(|f| chunks.get(&f.chunk_id).cloned())
            .collect();
        if head.is_empty() {
            return Vec::new();
        }
        let head_len = head.len();

        let call = self.reranker.rerank(raw_query, head, self.final_top_k);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(ranked)) => {
                let ordered = self.order_by_score(ranked, fused);
                debug!("Reranked {} candidates down to {}", head_len, ordered.len());
                ordered
            }
            Ok(Err(e)) => {
                warn!("Reranker failed ({}), falling back to fusion order", e);
                self.fusion_fallback(fused, chunks)
            }
            Err(_) => {
                warn!(
                    "Reranker timed out after {:?}, falling back to fusion order",
                    self.timeout
                );
                self.fusion_fallback(fused, chunks)
            }
        }
    }

    /// Sort model output by score descending, ties by fusion rank, and cap
    /// at `final_top_k`.
    fn order_by_score(
        &self,
        mut ranked: Vec<ScoredChunk>,
        fused: &[FusedResult],
    ) -> Vec<ScoredChunk> {
        let fusion_rank: HashMap<&str, usize> = fused
            .iter()
            .enumerate()
            .map(|(i, f)| (f.chunk_id.as_str(), i))
            .collect();
        let rank_of = |scored: &ScoredChunk| {
            fusion_rank
                .get(scored.chunk.id.as_str())
                .copied()
                .unwrap_or(usize::MAX)
        };
        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| rank_of(a).cmp(&rank_of(b)))
        });
        ranked.truncate(self.final_top_k);
        ranked
    }

    /// Fusion-ordered head of the candidate list, with the fusion score
    /// standing in for a model score.
    fn fusion_fallback(
        &self,
        fused: &[FusedResult],
        chunks: &HashMap<String, Chunk>,
    ) -> Vec<ScoredChunk> {
        fused
            .iter()
            .take(self.final_top_k)
            .filter_map(|f| {
                chunks.get(&f.chunk_id).map(|chunk| ScoredChunk {
                    chunk: chunk.clone(),
                    score: f.fusion_score as f32,
                })
            })
            .collect()
    }
}
