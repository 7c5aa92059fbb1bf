use stable_bloom_rs::{StableBloomFilter, StableBloomFilterStats};
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Installs a fmt subscriber honouring `RUST_LOG`. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Consistent, distinct test items.
#[allow(dead_code)]
pub fn generate_test_items(prefix: &str, count: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|i| format!("{prefix}_{i:06}").into_bytes())
        .collect()
}

/// Polls until the filter has completed at least `cycles` decay cycles.
#[allow(dead_code)]
pub fn wait_for_cycles(filter: &StableBloomFilter, cycles: u64) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while filter.decay_cycles() < cycles && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert!(
        filter.decay_cycles() >= cycles,
        "Expected {cycles} decay cycle(s), got {}",
        filter.decay_cycles()
    );
}
