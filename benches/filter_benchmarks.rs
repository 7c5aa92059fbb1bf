use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::{Rng, distr::Alphanumeric};
use stable_bloom_rs::{
    AtomicBitArray, StableBloomFilter, StableBloomFilterOps,
    StableFilterConfigBuilder, decay::run_decay_cycle,
};
use std::{hint::black_box, sync::Arc, thread, time::Duration};

// Helper function to generate random string data
fn generate_random_string(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn generate_test_data(count: usize) -> Vec<String> {
    (0..count).map(|_| generate_random_string(32)).collect()
}

fn create_filter(capacity: usize) -> StableBloomFilter {
    let config = StableFilterConfigBuilder::default()
        .expected_items(capacity)
        .false_positive_rate(0.01)
        .decay_interval(Duration::from_secs(3600))
        .build()
        .expect("Failed to build config");
    StableBloomFilter::from_config(config).expect("Failed to create filter")
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_operations");

    for capacity in [1_000, 100_000, 1_000_000] {
        let test_data = generate_test_data(1_000);
        let filter = create_filter(capacity);
        group.throughput(Throughput::Elements(test_data.len() as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &test_data,
            |b, data| {
                b.iter(|| {
                    for item in data {
                        filter.insert(black_box(item.as_bytes()));
                    }
                })
            },
        );
        filter.stop_decay();
    }
    group.finish();
}

fn bench_contains(c: &mut Criterion) {
    let mut group = c.benchmark_group("contains_operations");

    for capacity in [1_000, 100_000, 1_000_000] {
        let test_data = generate_test_data(1_000);
        let filter = create_filter(capacity);
        for item in test_data.iter().step_by(2) {
            filter.insert(item.as_bytes());
        }
        group.throughput(Throughput::Elements(test_data.len() as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &test_data,
            |b, data| {
                b.iter(|| {
                    for item in data {
                        black_box(filter.contains(item.as_bytes()));
                    }
                })
            },
        );
        filter.stop_decay();
    }
    group.finish();
}

fn bench_concurrent_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_insert");
    let test_data = Arc::new(generate_test_data(10_000));

    for threads in [1, 4, 8] {
        let filter = Arc::new(create_filter(1_000_000));
        group.throughput(Throughput::Elements(test_data.len() as u64));

        group.bench_function(BenchmarkId::from_parameter(threads), |b| {
            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|t| {
                        let filter = Arc::clone(&filter);
                        let data = Arc::clone(&test_data);
                        thread::spawn(move || {
                            for item in data.iter().skip(t).step_by(threads) {
                                filter.insert(item.as_bytes());
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().expect("Insert thread panicked");
                }
            })
        });
        filter.stop_decay();
    }
    group.finish();
}

fn bench_decay_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("decay_cycle");

    for bits in [1 << 16, 1 << 20, 1 << 24] {
        let array = AtomicBitArray::new(bits);
        for workers in [1, 4] {
            group.bench_with_input(
                BenchmarkId::new(format!("workers_{workers}"), bits),
                &workers,
                |b, &workers| {
                    b.iter(|| {
                        for i in 0..array.num_words() {
                            array.store_word(i, u64::MAX);
                        }
                        black_box(run_decay_cycle(&array, 0.01, workers, 42))
                    })
                },
            );
        }
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_contains,
    bench_concurrent_insert,
    bench_decay_cycle
);
criterion_main!(benches);
