// Criterion benches for the hot paths: resident lookups, eviction churn,
// and filler-backed fetches under a skewed key distribution.
use core::num::NonZeroUsize;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use iht_cache::{FastKey, IhtCache, IhtCacheConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// Benchmark configuration
const CACHE_SIZE: usize = 1_000;
const NUM_OPERATIONS: usize = 10_000;

fn nz(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

fn make_u64_cache(cap: usize) -> IhtCache {
    IhtCache::new(nz(cap), nz(8), nz(8))
}

fn make_wide_cache(cap: usize) -> IhtCache {
    IhtCache::init(
        IhtCacheConfig {
            min_capacity: nz(cap),
            key_size: nz(24),
            value_size: nz(48),
            max_load_factor: 0.4,
        },
        None,
    )
}

/// Seeded key stream over `[0, space)` where a few keys soak up most of the
/// traffic, like hot keys do in a live workload. A uniform draw pushed
/// through a cubic curve lands near zero most of the time, so low key ids
/// play the hot set.
fn hot_key_stream(space: usize, count: usize) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    (0..count)
        .map(|_| {
            let u: f64 = rng.gen();
            ((u * u * u) * space as f64) as u64 % space as u64
        })
        .collect()
}

fn benchmark_hit_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("Hit Path");

    group.bench_function("lookup", |b| {
        let mut cache = make_u64_cache(CACHE_SIZE);
        for k in 0..CACHE_SIZE as u64 {
            cache.put(&k.to_ne_bytes(), &k.to_ne_bytes());
        }
        let mut out = [0u8; 8];
        let mut k = 0u64;
        b.iter(|| {
            k = (k + 1) % CACHE_SIZE as u64;
            black_box(cache.lookup(&k.to_ne_bytes(), &mut out));
        });
    });

    group.bench_function("get_fast", |b| {
        let mut cache = make_u64_cache(CACHE_SIZE);
        for k in 0..CACHE_SIZE as u64 {
            cache.put(&k.to_ne_bytes(), &k.to_ne_bytes());
        }
        let mut k = 0u64;
        b.iter(|| {
            k = (k + 1) % CACHE_SIZE as u64;
            black_box(cache.get_fast(FastKey::new(k, 0)));
        });
    });

    group.finish();
}

fn benchmark_put_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("Put Churn");

    group.bench_function("u64 keys", |b| {
        let mut cache = make_u64_cache(CACHE_SIZE);
        let mut k = 0u64;
        b.iter(|| {
            // Distinct keys keep the eviction sweep permanently engaged.
            k += 1;
            black_box(cache.put(&k.to_ne_bytes(), &k.to_ne_bytes()));
        });
    });

    group.bench_function("wide keys", |b| {
        let mut cache = make_wide_cache(CACHE_SIZE);
        let mut k = 0u64;
        let mut key = [0u8; 24];
        let value = [7u8; 48];
        b.iter(|| {
            k += 1;
            key[..8].copy_from_slice(&k.to_ne_bytes());
            black_box(cache.put(&key, &value));
        });
    });

    group.finish();
}

fn benchmark_fetch_with_filler(c: &mut Criterion) {
    let samples = hot_key_stream(CACHE_SIZE * 2, NUM_OPERATIONS);

    let mut group = c.benchmark_group("Fetch With Filler");

    group.bench_function("hot keys", |b| {
        b.iter(|| {
            let mut cache = IhtCache::with_filler(
                nz(CACHE_SIZE),
                nz(8),
                nz(8),
                Box::new(|key, out| {
                    let k = u64::from_ne_bytes(key.try_into().unwrap());
                    out.copy_from_slice(&(k * 2).to_ne_bytes());
                    true
                }),
            );
            let mut out = [0u8; 8];
            for &k in &samples {
                black_box(cache.fetch(&k.to_ne_bytes(), &mut out));
            }
        });
    });

    group.finish();
}

fn benchmark_mixed_access(c: &mut Criterion) {
    let samples = hot_key_stream(CACHE_SIZE * 2, NUM_OPERATIONS);

    let mut group = c.benchmark_group("Mixed Access");

    group.bench_function("one put per three lookups", |b| {
        b.iter(|| {
            let mut cache = make_u64_cache(CACHE_SIZE);
            let mut out = [0u8; 8];
            for &k in &samples {
                if k % 4 == 0 {
                    black_box(cache.put(&k.to_ne_bytes(), &k.to_ne_bytes()));
                } else {
                    black_box(cache.lookup(&k.to_ne_bytes(), &mut out));
                }
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_hit_path,
    benchmark_put_churn,
    benchmark_fetch_with_filler,
    benchmark_mixed_access
);
criterion_main!(benches);
