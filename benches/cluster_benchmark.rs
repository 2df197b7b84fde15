//! Benchmark for the region-detector clustering pass.
//!
//! Connected-component grouping is O(n²) over image placements; pages with
//! hundreds of small raster objects (tiled scans) are the worst case worth
//! tracking.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use clinpdf::detect::cluster_rectangles;
use clinpdf::Rect;

/// Deterministic pseudo-random rectangles (LCG; no RNG dependency).
fn synthetic_rects(count: usize) -> Vec<Rect> {
    let mut state = 0x2545F4914F6CDD1Du64;
    let mut next = || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((state >> 33) % 1000) as f32
    };

    (0..count)
        .map(|_| {
            let x = next() * 0.6;
            let y = next() * 0.75;
            Rect::new(x, y, x + 20.0 + next() * 0.05, y + 20.0 + next() * 0.05)
        })
        .collect()
}

fn bench_clustering(c: &mut Criterion) {
    let mut group = c.benchmark_group("cluster_rectangles");

    for &count in &[50usize, 200, 500] {
        let rects = synthetic_rects(count);
        group.bench_function(format!("{count}_rects"), |b| {
            b.iter(|| cluster_rectangles(black_box(&rects), black_box(50.0)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_clustering);
criterion_main!(benches);
