//! Stable Bloom Filter: a concurrent Bloom filter that forgets.
//!
//! A classic Bloom filter only ever gets denser, so under an unbounded stream
//! its false positive rate drifts towards 1. This crate periodically clears
//! bits at random ("decay") to keep the density, and with it the false
//! positive rate, bounded.
//!
//! HowTo:
//!    * Bit array: `m` bits stored in atomic 64-bit words, `m` rounded up to a
//!      multiple of 64.
//!    * Hashing: `k` independent hash functions, element `e` maps to bits
//!      `hash_i(e) mod m`. Defaults to seeded Murmur3.
//!    * Sizing: `m` and `k` derive from expected items and target FPR when the
//!      filter is built by capacity.
//!
//! Insertion:
//!     * Set all `k` bits with atomic fetch-or. Never blocks, never fails.
//! Query:
//!     * `true` iff all `k` bits are set. `false` is definitive absence.
//! Decay:
//!     * A background thread wakes once per interval, splits the word range
//!       across workers, and clears every set bit with probability
//!       `decay_rate`.
//!     * `stop_decay` ends the thread after the in-flight cycle completes.
//!
//! Obvious problems:
//!     * Decay and inserts race at word granularity, an insert landing during
//!       decay of the same word may be lost. This is part of the forgetting
//!       contract, not a corruption: unrelated bits are never touched.
//!     * The FPR estimate assumes bit density is independent per hash slot.
//!
//! ```
//! use std::time::Duration;
//! use stable_bloom_rs::{StableBloomFilter, StableBloomFilterOps};
//!
//! let filter = StableBloomFilter::with_capacity(10_000, 0.01, 0.01, Duration::from_secs(60))?;
//! filter.insert(b"user_42");
//! assert!(filter.contains(b"user_42"));
//! filter.stop_decay();
//! # Ok::<(), stable_bloom_rs::FilterError>(())
//! ```

mod bits;
pub mod config;
pub mod decay;
mod error;
mod filter;
mod hash;
mod traits;

pub use bits::{AtomicBitArray, MAX_BITS, WORD_BITS};
pub use config::{
    FilterParams, StableFilterConfig, StableFilterConfigBuilder,
    StableFilterConfigBuilderError,
};
pub use error::{FilterError, Result};
pub use filter::StableBloomFilter;
pub use hash::{
    DEFAULT_NUM_HASHES, HashFunction, HashIndexer, Murmur3Hash,
    default_hash_functions, optimal_bit_vector_size, optimal_num_hashes,
};
pub use traits::{
    BulkStableBloomFilterOps, StableBloomFilterOps, StableBloomFilterStats,
};
