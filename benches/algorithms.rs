//! Benchmarks for rate limiting algorithms.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ratelimit_core::{
    algorithm::Algorithm, storage::MemoryStorage, FixedWindow, LeakingBucket, Quota,
    SlidingWindowCounter, SlidingWindowLog, TokenBucket,
};
use tokio::runtime::Runtime;

const NOW_MS: u64 = 1_700_000_000_000;

fn bench_algorithms(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let quota = Quota::per_second(1000).with_bucket_size(100);

    let mut group = c.benchmark_group("algorithms");

    group.bench_function("token_bucket", |b| {
        let storage = MemoryStorage::new();
        let algorithm = TokenBucket::new();
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            let key = format!("token:{}", i % 100);
            rt.block_on(async {
                black_box(
                    algorithm
                        .check_and_record(&storage, &key, &quota, NOW_MS)
                        .await,
                )
            })
        })
    });

    group.bench_function("fixed_window", |b| {
        let storage = MemoryStorage::new();
        let algorithm = FixedWindow::new();
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            let key = format!("fixed:{}", i % 100);
            rt.block_on(async {
                black_box(
                    algorithm
                        .check_and_record(&storage, &key, &quota, NOW_MS)
                        .await,
                )
            })
        })
    });

    group.bench_function("sliding_window_counter", |b| {
        let storage = MemoryStorage::new();
        let algorithm = SlidingWindowCounter::new();
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            let key = format!("swc:{}", i % 100);
            rt.block_on(async {
                black_box(
                    algorithm
                        .check_and_record(&storage, &key, &quota, NOW_MS)
                        .await,
                )
            })
        })
    });

    group.bench_function("leaking_bucket", |b| {
        let storage = MemoryStorage::new();
        let algorithm = LeakingBucket::new();
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            let key = format!("leaky:{}", i % 100);
            rt.block_on(async {
                black_box(
                    algorithm
                        .check_and_record(&storage, &key, &quota, NOW_MS)
                        .await,
                )
            })
        })
    });

    group.bench_function("sliding_window_log", |b| {
        let storage = MemoryStorage::new();
        let algorithm = SlidingWindowLog::new();
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            let key = format!("log:{}", i % 100);
            rt.block_on(async {
                black_box(
                    algorithm
                        .check_and_record(&storage, &key, &quota, NOW_MS)
                        .await,
                )
            })
        })
    });

    group.finish();
}

fn bench_algorithm_comparison(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let quota = Quota::per_second(10000).with_bucket_size(100);

    let mut group = c.benchmark_group("algorithm_comparison");

    for num_keys in [1, 10, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::new("token_bucket", num_keys),
            num_keys,
            |b, &num_keys| {
                let storage = MemoryStorage::new();
                let algorithm = TokenBucket::new();
                let mut i = 0u64;
                b.iter(|| {
                    i += 1;
                    let key = format!("k:{}", i % num_keys);
                    rt.block_on(async {
                        black_box(
                            algorithm
                                .check_and_record(&storage, &key, &quota, NOW_MS)
                                .await,
                        )
                    })
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("fixed_window", num_keys),
            num_keys,
            |b, &num_keys| {
                let storage = MemoryStorage::new();
                let algorithm = FixedWindow::new();
                let mut i = 0u64;
                b.iter(|| {
                    i += 1;
                    let key = format!("k:{}", i % num_keys);
                    rt.block_on(async {
                        black_box(
                            algorithm
                                .check_and_record(&storage, &key, &quota, NOW_MS)
                                .await,
                        )
                    })
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_algorithms, bench_algorithm_comparison);
criterion_main!(benches);
