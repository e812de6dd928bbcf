//! Reciprocal Rank Fusion.

use std::collections::HashMap;

use ragpipe_core::{FusedResult, RankedCandidate};

/// Merges ranked candidate lists from independent search passes.
///
/// Lexical and vector engines score on incomparable scales, so fusion uses
/// rank positions only: each appearance of a chunk contributes
/// `1 / (rrf_k + rank)` to its fusion score. The constant dampens how much
/// rank 1 dominates rank 2 relative to the long tail.
#[derive(Debug, Clone)]
pub struct RankFuser {
    rrf_k: u32,
}

impl RankFuser {
    #[must_use]
    pub fn new(rrf_k: u32) -> Self {
        Self { rrf_k }
    }

    /// Fuse all passes into one ranked list of unique chunks.
    ///
    /// Output is sorted by fusion score descending, ties broken by
    /// appearance count descending, then chunk id ascending. A chunk absent
    /// from every pass never appears.
    pub fn fuse(&self, passes: &[Vec<RankedCandidate>]) -> Vec<FusedResult> {
        let mut by_chunk: HashMap<&str, FusedResult> = HashMap::new();
        for pass in passes {
            for candidate in pass {
                let entry = by_chunk
                    .entry(candidate.chunk_id.as_str())
                    .or_insert_with(|| FusedResult {
                        chunk_id: candidate.chunk_id.clone(),
                        fusion_score: 0.0,
                        appearance_count: 0,
                    });
                entry.fusion_score += 1.0 / (f64::from(self.rrf_k) + candidate.rank as f64);
                entry.appearance_count += 1;
            }
        }

        let mut fused: Vec<FusedResult> = by_chunk.into_values().collect();
        fused.sort_by(|a, b| {
            b.fusion_score
                .total_cmp(&a.fusion_score)
                .then_with(|| b.appearance_count.cmp(&a.appearance_count))
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        fused
    }
}
