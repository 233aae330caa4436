//! Policy benchmarks on a synthetic skewed workload.
//!
//! Every policy replays the same read-through key stream: roughly 80% of
//! reads target a small hot set, the rest spread over a large cold range.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use hypercache::PolicyKind;

const CAPACITY: usize = 1024;
const SAMPLE_SIZE: usize = 64;
const OPS: usize = 50_000;
const HOT_KEYS: u64 = 512;
const COLD_KEYS: u64 = 100_000;

fn skewed_keys(seed: u64) -> Vec<String> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..OPS)
        .map(|_| {
            if rng.random_bool(0.8) {
                format!("hot:{}", rng.random_range(0..HOT_KEYS))
            } else {
                format!("cold:{}", rng.random_range(0..COLD_KEYS))
            }
        })
        .collect()
}

// =============================================================================
// Read-through replay
// =============================================================================

fn bench_read_through(c: &mut Criterion) {
    let keys = skewed_keys(42);
    let mut group = c.benchmark_group("read_through");
    group.throughput(Throughput::Elements(OPS as u64));

    for policy in PolicyKind::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(policy), &keys, |b, keys| {
            b.iter(|| {
                let mut cache = policy.build(CAPACITY, SAMPLE_SIZE, Some(7)).unwrap();
                for (ts, key) in keys.iter().enumerate() {
                    if !cache.get(key) {
                        cache.set(ts as u64, key);
                    }
                }
                black_box(cache.stats())
            })
        });
    }

    group.finish();
}

// =============================================================================
// Eviction-heavy insert stream
// =============================================================================

fn bench_insert_evict(c: &mut Criterion) {
    let keys: Vec<String> = (0..OPS).map(|i| format!("k{}", i)).collect();
    let mut group = c.benchmark_group("insert_evict");
    group.throughput(Throughput::Elements(OPS as u64));

    for policy in PolicyKind::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(policy), &keys, |b, keys| {
            b.iter(|| {
                let mut cache = policy.build(CAPACITY, SAMPLE_SIZE, Some(7)).unwrap();
                for (ts, key) in keys.iter().enumerate() {
                    cache.set(ts as u64, key);
                }
                black_box(cache.len())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_read_through, bench_insert_evict);
criterion_main!(benches);
