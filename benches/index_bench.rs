//! Ordered index and leaderboard benchmarks

use std::num::NonZeroUsize;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ranked_index::{CachedIndex, Leaderboard, OrderedIndex, RankedIndex};

fn create_random_entries(n: usize) -> Vec<(String, f64)> {
    (0..n)
        .map(|i| (format!("id{}", i), rand::random::<f64>()))
        .collect()
}

fn benchmark_index_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_insert");

    for &size in &[1_000, 10_000] {
        let entries = create_random_entries(size);

        group.bench_with_input(BenchmarkId::new("one_by_one", size), &size, |b, _| {
            b.iter(|| {
                let mut index = OrderedIndex::new();
                for (id, metric) in &entries {
                    index.insert(id, *metric).unwrap();
                }
                black_box(index.len())
            });
        });

        group.bench_with_input(BenchmarkId::new("bulk", size), &size, |b, _| {
            b.iter(|| {
                let mut index = OrderedIndex::new();
                black_box(index.insert_bulk(&entries).unwrap())
            });
        });
    }

    group.finish();
}

fn benchmark_index_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_queries");

    for &size in &[1_000, 10_000, 100_000] {
        let entries = create_random_entries(size);
        let mut plain = OrderedIndex::new();
        plain.insert_bulk(&entries).unwrap();
        let mut cached = CachedIndex::new(OrderedIndex::new(), NonZeroUsize::new(64).unwrap());
        cached.insert_bulk(&entries).unwrap();

        group.bench_with_input(BenchmarkId::new("range", size), &size, |b, _| {
            b.iter(|| plain.range(black_box(0.40), black_box(0.41)));
        });

        group.bench_with_input(BenchmarkId::new("range_cached", size), &size, |b, _| {
            b.iter(|| cached.range(black_box(0.40), black_box(0.41)));
        });

        group.bench_with_input(BenchmarkId::new("rank", size), &size, |b, _| {
            b.iter(|| plain.rank(black_box(0.5)));
        });

        group.bench_with_input(BenchmarkId::new("kth_smallest", size), &size, |b, _| {
            b.iter(|| plain.kth_smallest(black_box(size / 2)));
        });
    }

    group.finish();
}

fn benchmark_leaderboard(c: &mut Criterion) {
    let mut group = c.benchmark_group("leaderboard");
    group.sample_size(20);

    for &size in &[1_000, 10_000] {
        let entries = create_random_entries(size);
        let board = Leaderboard::new();
        board.add_results_bulk(&entries).unwrap();

        group.bench_with_input(BenchmarkId::new("top_10", size), &size, |b, _| {
            b.iter(|| board.top_k(black_box(10)));
        });

        group.bench_with_input(BenchmarkId::new("top_100", size), &size, |b, _| {
            b.iter(|| board.top_k(black_box(100)));
        });

        group.bench_with_input(BenchmarkId::new("improve_then_rank", size), &size, |b, _| {
            let mut value = 0.0;
            b.iter(|| {
                value -= 1.0;
                board.add_result("id0", value).unwrap();
                board.rank(black_box("id0"))
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_index_insert,
    benchmark_index_queries,
    benchmark_leaderboard
);
criterion_main!(benches);
