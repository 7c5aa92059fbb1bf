use crate::bits::{AtomicBitArray, MAX_BITS};
use crate::config::{FilterParams, StableFilterConfig, StableFilterConfigBuilder};
use crate::decay::{DecayScheduler, DecaySettings, Decayer};
use crate::error::{FilterError, Result};
use crate::hash::{HashFunction, HashIndexer, default_hash_functions};
use crate::traits::{
    BulkStableBloomFilterOps, StableBloomFilterOps, StableBloomFilterStats,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Bloom filter whose bits decay over time, so the false positive rate stays
/// bounded under an unbounded stream of inserts.
///
/// A background thread started at construction clears every set bit with
/// probability `decay_rate` once per `decay_interval`. Call
/// [`stop_decay`](Self::stop_decay) (or drop the filter) to end it; inserts and
/// lookups keep working afterwards.
pub struct StableBloomFilter {
    bits: Arc<AtomicBitArray>,
    indexer: HashIndexer,
    decayer: Arc<Decayer>,
    scheduler: DecayScheduler,
}

impl StableBloomFilter {
    /// Creates a filter with an explicit bit size and hash family.
    ///
    /// `bit_size` is rounded up to a multiple of 64. An empty
    /// `hash_functions` selects seven seeded Murmur3 hashes.
    pub fn new(
        bit_size: usize,
        hash_functions: Vec<Arc<dyn HashFunction>>,
        decay_rate: f64,
        decay_interval: Duration,
    ) -> Result<Self> {
        Self::build(
            bit_size,
            hash_functions,
            DecaySettings::new(decay_rate, decay_interval, None, None),
        )
    }

    /// Same as [`new`](Self::new) with a fixed base seed for decay workers.
    pub fn with_seed(
        bit_size: usize,
        hash_functions: Vec<Arc<dyn HashFunction>>,
        decay_rate: f64,
        decay_interval: Duration,
        seed: u64,
    ) -> Result<Self> {
        Self::build(
            bit_size,
            hash_functions,
            DecaySettings::new(decay_rate, decay_interval, None, Some(seed)),
        )
    }

    /// Creates a filter sized for `expected_items` at `false_positive_rate`.
    ///
    /// A zero `decay_rate` becomes 0.01 and a zero `decay_interval` becomes one
    /// minute.
    pub fn with_capacity(
        expected_items: usize,
        false_positive_rate: f64,
        decay_rate: f64,
        decay_interval: Duration,
    ) -> Result<Self> {
        let config = StableFilterConfigBuilder::default()
            .expected_items(expected_items)
            .false_positive_rate(false_positive_rate)
            .decay_rate(decay_rate)
            .decay_interval(decay_interval)
            .build()?;
        Self::from_config(config)
    }

    pub fn from_config(config: StableFilterConfig) -> Result<Self> {
        config.validate()?;
        let params = FilterParams::try_from(&config)?;

        Self::build(
            params.bit_vector_size,
            default_hash_functions(params.num_hashes),
            DecaySettings::new(
                config.effective_decay_rate(),
                config.effective_decay_interval(),
                config.decay_workers,
                config.seed,
            ),
        )
    }

    fn build(
        bit_size: usize,
        hash_functions: Vec<Arc<dyn HashFunction>>,
        settings: DecaySettings,
    ) -> Result<Self> {
        if bit_size == 0 {
            return Err(FilterError::ZeroBitSize);
        }
        if bit_size > MAX_BITS {
            return Err(FilterError::BitSizeTooLarge {
                bits: bit_size as f64,
            });
        }
        if !(0.0..=1.0).contains(&settings.decay_rate) {
            return Err(FilterError::InvalidDecayRate {
                rate: settings.decay_rate,
            });
        }
        if settings.interval.is_zero() {
            return Err(FilterError::ZeroDecayInterval);
        }

        let bits = Arc::new(AtomicBitArray::new(bit_size));
        let indexer = HashIndexer::new(hash_functions, bits.len());
        let decayer = Arc::new(Decayer::new(Arc::clone(&bits), settings));
        let scheduler = DecayScheduler::start(Arc::clone(&decayer))?;

        info!(
            bit_size = bits.len(),
            num_hashes = indexer.num_hashes(),
            decay_rate = settings.decay_rate,
            decay_interval = ?settings.interval,
            decay_workers = settings.workers,
            "Created stable bloom filter"
        );

        Ok(Self {
            bits,
            indexer,
            decayer,
            scheduler,
        })
    }

    /// Stops the background decay task, blocking until an in-flight cycle
    /// finishes (a concurrent [`decay_now`](Self::decay_now) included). No
    /// background decay happens after this returns. Safe to call more than
    /// once.
    pub fn stop_decay(&self) {
        self.scheduler.stop();
    }

    pub fn is_decaying(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Runs one decay cycle on the calling thread and returns the number of
    /// bits cleared. Waits if the background task is mid-cycle.
    pub fn decay_now(&self) -> usize {
        self.decayer.run_cycle()
    }
}

impl StableBloomFilterOps for StableBloomFilter {
    fn insert(&self, item: &[u8]) {
        for idx in self.indexer.indices(item) {
            self.bits.set_bit(idx);
        }
    }

    fn contains(&self, item: &[u8]) -> bool {
        self.indexer.indices(item).all(|idx| self.bits.get_bit(idx))
    }

    fn contains_or_insert(&self, item: &[u8]) -> bool {
        if self.contains(item) {
            return true;
        }
        self.insert(item);
        false
    }
}

impl BulkStableBloomFilterOps for StableBloomFilter {
    fn insert_bulk(&self, items: &[&[u8]]) {
        for item in items {
            self.insert(item);
        }
    }

    fn contains_bulk(&self, items: &[&[u8]]) -> Vec<bool> {
        items.iter().map(|item| self.contains(item)).collect()
    }
}

impl StableBloomFilterStats for StableBloomFilter {
    fn bit_size(&self) -> usize {
        self.bits.len()
    }

    fn num_hashes(&self) -> usize {
        self.indexer.num_hashes()
    }

    fn decay_rate(&self) -> f64 {
        self.decayer.settings().decay_rate
    }

    fn decay_interval(&self) -> Duration {
        self.decayer.settings().interval
    }

    fn count_set_bits(&self) -> usize {
        self.bits.count_set_bits()
    }

    fn fill_ratio(&self) -> f64 {
        self.bits.count_set_bits() as f64 / self.bits.len() as f64
    }

    fn estimate_false_positive_rate(&self) -> f64 {
        self.fill_ratio().powi(self.indexer.num_hashes() as i32)
    }

    fn decay_cycles(&self) -> u64 {
        self.decayer.cycles()
    }
}

impl std::fmt::Debug for StableBloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "StableBloomFilter {{ bit_size: {}, num_hashes: {}, decay_rate: {}, decay_interval: {:?}, decaying: {} }}",
            self.bits.len(),
            self.indexer.num_hashes(),
            self.decayer.settings().decay_rate,
            self.decayer.settings().interval,
            self.is_decaying(),
        )
    }
}
