//! Indexed store benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ranked_index::{IndexedStore, Record, StoreConfig};

const JOCKEYS: [&str; 8] = ["Smith", "Jones", "Baker", "Cole", "Reid", "Hart", "Moss", "Lane"];

fn create_records(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| {
            Record::new(format!("H{}", i))
                .with("jockey", JOCKEYS[i % JOCKEYS.len()])
                .with("age", (2 + i % 10) as i64)
                .with("weight", 400.0 + rand::random::<f64>() * 150.0)
        })
        .collect()
}

fn benchmark_store_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_get");

    for &cache_size in &[0, 100, 10_000] {
        let store = IndexedStore::with_config(&StoreConfig {
            cache_size,
            cache_ttl_secs: 0,
            ..StoreConfig::default()
        });
        store.insert_bulk(create_records(10_000));

        group.bench_with_input(BenchmarkId::new("cache", cache_size), &cache_size, |b, _| {
            let mut i = 0usize;
            b.iter(|| {
                i = (i + 1) % 200;
                store.get(black_box(&format!("H{}", i)))
            });
        });
    }

    group.finish();
}

fn benchmark_store_find(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_find");

    for &size in &[1_000, 10_000] {
        let indexed = IndexedStore::with_config(&StoreConfig::indexing(["jockey", "age"]));
        indexed.insert_bulk(create_records(size));
        let unindexed = IndexedStore::new();
        unindexed.insert_bulk(create_records(size));

        group.bench_with_input(BenchmarkId::new("indexed", size), &size, |b, _| {
            b.iter(|| indexed.find_by_attribute(black_box("jockey"), "Smith"));
        });

        group.bench_with_input(BenchmarkId::new("scan", size), &size, |b, _| {
            b.iter(|| unindexed.find_by_attribute(black_box("jockey"), "Smith"));
        });

        group.bench_with_input(BenchmarkId::new("range_indexed", size), &size, |b, _| {
            b.iter(|| indexed.find_by_attribute_range(black_box("age"), 3.0, 5.0));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_store_get, benchmark_store_find);
criterion_main!(benches);
