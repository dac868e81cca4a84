//! Benchmarks for the five rate limiting algorithms.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rate_limiter_engine::algorithm::{
    FixedWindow, LeakyBucket, MultipleBuckets, RateLimitAlgorithm, SlidingWindow, TokenBucket,
};
use rate_limiter_engine::{FakeClock, MemoryStore};
use tokio::runtime::Runtime;

fn bench_algorithms(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("algorithms");

    group.bench_function("token_bucket", |b| {
        let store = MemoryStore::new();
        let algorithm = TokenBucket::with_clock(1000.0, 100, Arc::new(FakeClock::new()));
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            let key = format!("token:{}", i % 100);
            rt.block_on(async { black_box(algorithm.check(&store, &key).await) })
        })
    });

    group.bench_function("fixed_window", |b| {
        let store = MemoryStore::new();
        let algorithm = FixedWindow::with_clock(1000, 1, Arc::new(FakeClock::new()));
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            let key = format!("fixed:{}", i % 100);
            rt.block_on(async { black_box(algorithm.check(&store, &key).await) })
        })
    });

    group.bench_function("sliding_window", |b| {
        let store = MemoryStore::new();
        let algorithm = SlidingWindow::with_clock(1000, 1, Arc::new(FakeClock::new()));
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            let key = format!("sliding:{}", i % 100);
            rt.block_on(async { black_box(algorithm.check(&store, &key).await) })
        })
    });

    group.bench_function("leaky_bucket", |b| {
        let store = MemoryStore::new();
        let algorithm = LeakyBucket::with_clock(1000.0, 100, Arc::new(FakeClock::new()));
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            let key = format!("leaky:{}", i % 100);
            rt.block_on(async { black_box(algorithm.check(&store, &key).await) })
        })
    });

    group.bench_function("multiple_buckets", |b| {
        let store = MemoryStore::new();
        let algorithm = MultipleBuckets::with_clock(1000.0, 100, 1000, 60, Arc::new(FakeClock::new()));
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            let key = format!("multi:{}", i % 100);
            rt.block_on(async { black_box(algorithm.check(&store, &key).await) })
        })
    });

    group.finish();
}

fn bench_key_cardinality(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("key_cardinality");

    for num_keys in [1, 10, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::new("token_bucket", num_keys),
            num_keys,
            |b, &num_keys| {
                let store = MemoryStore::new();
                let algorithm = TokenBucket::with_clock(10000.0, 100, Arc::new(FakeClock::new()));
                let mut i = 0u64;
                b.iter(|| {
                    i += 1;
                    let key = format!("k:{}", i % num_keys);
                    rt.block_on(async { black_box(algorithm.check(&store, &key).await) })
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("fixed_window", num_keys),
            num_keys,
            |b, &num_keys| {
                let store = MemoryStore::new();
                let algorithm = FixedWindow::with_clock(10000, 1, Arc::new(FakeClock::new()));
                let mut i = 0u64;
                b.iter(|| {
                    i += 1;
                    let key = format!("k:{}", i % num_keys);
                    rt.block_on(async { black_box(algorithm.check(&store, &key).await) })
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_algorithms, bench_key_cardinality);
criterion_main!(benches);
