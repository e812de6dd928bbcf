//! Benchmarks for Reciprocal Rank Fusion.
//!
//! Measures fusion latency across pass sizes and pass counts.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ragpipe_core::RankedCandidate;
use ragpipe_retrieval::RankFuser;

/// Build one ranked pass of `len` candidates drawn from a pool of
/// `pool_size` chunk ids, rotated by `offset` so passes overlap partially.
fn build_pass(len: usize, pool_size: usize, offset: usize) -> Vec<RankedCandidate> {
    (0..len)
        .map(|rank| RankedCandidate {
            chunk_id: format!("chunk-{:05}", (rank + offset) % pool_size),
            rank: rank + 1,
            raw_score: 1.0 / (rank + 1) as f32,
        })
        .collect()
}

fn fusion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("fusion");

    // Six passes (three query variations times two modalities), the shape
    // one question produces.
    for pass_len in &[20, 100, 500] {
        let passes: Vec<Vec<RankedCandidate>> = (0..6)
            .map(|pass_no| build_pass(*pass_len, *pass_len * 2, pass_no * 7))
            .collect();
        let fuser = RankFuser::new(60);

        group.bench_with_input(
            BenchmarkId::new("six_passes", format!("{pass_len}_candidates")),
            pass_len,
            |b, _| {
                b.iter(|| black_box(fuser.fuse(&passes)));
            },
        );
    }

    // Scaling with the number of passes at a fixed pass length.
    for pass_count in &[2, 6, 12] {
        let passes: Vec<Vec<RankedCandidate>> = (0..*pass_count)
            .map(|pass_no| build_pass(100, 200, pass_no * 7))
            .collect();
        let fuser = RankFuser::new(60);

        group.bench_with_input(
            BenchmarkId::new("pass_count", format!("{pass_count}_passes")),
            pass_count,
            |b, _| {
                b.iter(|| black_box(fuser.fuse(&passes)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, fusion_benchmark);
criterion_main!(benches);
