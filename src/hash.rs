use crate::bits::MAX_BITS;
use crate::error::{FilterError, Result};
use murmur3::murmur3_x64_128;
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

/// Number of hash functions used when the caller supplies none.
pub const DEFAULT_NUM_HASHES: usize = 7;

/// A single member of the hash family used to derive bit positions.
///
/// Implementations must be deterministic and stateless: the same input always
/// maps to the same 64-bit value. Any `Fn(&[u8]) -> u64 + Send + Sync` closure
/// is a `HashFunction`, so callers can plug in their own algorithm:
///
/// ```
/// use std::sync::Arc;
/// use stable_bloom_rs::HashFunction;
///
/// let h: Arc<dyn HashFunction> = Arc::new(|data: &[u8]| data.len() as u64);
/// assert_eq!(h.hash64(b"abc"), 3);
/// ```
pub trait HashFunction: Send + Sync {
    fn hash64(&self, data: &[u8]) -> u64;
}

impl<F> HashFunction for F
where
    F: Fn(&[u8]) -> u64 + Send + Sync,
{
    fn hash64(&self, data: &[u8]) -> u64 {
        self(data)
    }
}

/// Seeded MurmurHash3 (x64, 128-bit) truncated to the low 64 bits.
///
/// Distinct seeds give the independent hash family the filter needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Murmur3Hash {
    seed: u32,
}

impl Murmur3Hash {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }
}

impl HashFunction for Murmur3Hash {
    fn hash64(&self, data: &[u8]) -> u64 {
        let mut cursor = Cursor::new(data);
        // Reading from an in-memory cursor cannot fail
        murmur3_x64_128(&mut cursor, self.seed)
            .expect("Failed to compute Murmur3 hash") as u64
    }
}

/// Builds `k` Murmur3 hashes seeded `0..k`.
pub fn default_hash_functions(k: usize) -> Vec<Arc<dyn HashFunction>> {
    (0..k)
        .map(|seed| Arc::new(Murmur3Hash::new(seed as u32)) as Arc<dyn HashFunction>)
        .collect()
}

/// Maps an element to `k` bit positions in `[0, bit_size)`.
#[derive(Clone)]
pub struct HashIndexer {
    hashers: Vec<Arc<dyn HashFunction>>,
    bit_size: usize,
}

impl HashIndexer {
    /// An empty `hashers` selects [`DEFAULT_NUM_HASHES`] default functions.
    pub fn new(hashers: Vec<Arc<dyn HashFunction>>, bit_size: usize) -> Self {
        let hashers = if hashers.is_empty() {
            default_hash_functions(DEFAULT_NUM_HASHES)
        } else {
            hashers
        };
        Self { hashers, bit_size }
    }

    pub fn num_hashes(&self) -> usize {
        self.hashers.len()
    }

    pub fn bit_size(&self) -> usize {
        self.bit_size
    }

    /// Position produced by the `i`-th hash function.
    #[inline]
    pub fn index(&self, item: &[u8], i: usize) -> usize {
        (self.hashers[i].hash64(item) % self.bit_size as u64) as usize
    }

    pub fn indices<'a>(
        &'a self,
        item: &'a [u8],
    ) -> impl Iterator<Item = usize> + 'a {
        (0..self.hashers.len()).map(move |i| self.index(item, i))
    }
}

impl fmt::Debug for HashIndexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashIndexer")
            .field("num_hashes", &self.hashers.len())
            .field("bit_size", &self.bit_size)
            .finish()
    }
}

/// Optimal bit array size for `n` expected items at false positive rate `p`:
/// `m = ceil(-n * ln(p) / ln(2)^2)`.
pub fn optimal_bit_vector_size(n: usize, p: f64) -> Result<usize> {
    if n == 0 {
        return Err(FilterError::ZeroExpectedItems);
    }
    if !(p > 0.0 && p < 1.0) {
        return Err(FilterError::InvalidFalsePositiveRate { rate: p });
    }
    let ln2 = std::f64::consts::LN_2;
    let bits = ((-(n as f64) * p.ln()) / (ln2 * ln2)).ceil();
    if !bits.is_finite() || bits >= MAX_BITS as f64 {
        return Err(FilterError::BitSizeTooLarge { bits });
    }
    Ok(bits as usize)
}

/// Optimal number of hash functions for `m` bits and `n` expected items:
/// `k = round((m / n) * ln(2))`.
pub fn optimal_num_hashes(m: usize, n: usize) -> Result<usize> {
    if n == 0 {
        return Err(FilterError::ZeroExpectedItems);
    }
    if m == 0 {
        return Err(FilterError::ZeroBitSize);
    }
    Ok(((m as f64 / n as f64) * std::f64::consts::LN_2).round() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimal_bit_vector_size_overflow() {
        match optimal_bit_vector_size(usize::MAX, 1e-300) {
            Err(FilterError::BitSizeTooLarge { bits }) => {
                assert!(bits > MAX_BITS as f64)
            }
            other => panic!("Expected BitSizeTooLarge, got {other:?}"),
        }
        assert!(optimal_bit_vector_size(usize::MAX / 4, 0.5).is_ok());
    }

    #[test]
    fn test_optimal_bit_vector_size() {
        assert_eq!(optimal_bit_vector_size(1000, 0.01).unwrap(), 9586);
        assert_eq!(optimal_bit_vector_size(1000, 0.001).unwrap(), 14378);
    }

    #[test]
    fn test_optimal_bit_vector_size_rejects_bad_input() {
        assert!(matches!(
            optimal_bit_vector_size(0, 0.01),
            Err(FilterError::ZeroExpectedItems)
        ));
        for p in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            assert!(
                matches!(
                    optimal_bit_vector_size(1000, p),
                    Err(FilterError::InvalidFalsePositiveRate { .. })
                ),
                "p = {p} should be rejected"
            );
        }
    }

    #[test]
    fn test_optimal_num_hashes() {
        assert_eq!(optimal_num_hashes(9586, 1000).unwrap(), 7);
        assert_eq!(optimal_num_hashes(14378, 1000).unwrap(), 10);
        assert!(matches!(
            optimal_num_hashes(0, 1000),
            Err(FilterError::ZeroBitSize)
        ));
        assert!(matches!(
            optimal_num_hashes(9586, 0),
            Err(FilterError::ZeroExpectedItems)
        ));
    }

    #[test]
    fn test_indices_stay_in_bounds() {
        let indexer = HashIndexer::new(Vec::new(), 1024);
        assert_eq!(indexer.num_hashes(), DEFAULT_NUM_HASHES);

        for i in 0..500 {
            let item = format!("test_data_{i}");
            for idx in indexer.indices(item.as_bytes()) {
                assert!(idx < 1024, "index out of bounds: {idx}");
            }
        }
    }

    #[test]
    fn test_seeds_produce_distinct_hashes() {
        let hashers = default_hash_functions(4);
        let values: Vec<u64> =
            hashers.iter().map(|h| h.hash64(b"some data")).collect();
        for i in 0..values.len() {
            for j in (i + 1)..values.len() {
                assert_ne!(values[i], values[j]);
            }
        }
        // Deterministic across calls
        assert_eq!(hashers[0].hash64(b"some data"), values[0]);
    }

    #[test]
    fn test_custom_closure_hashers() {
        let hashers: Vec<Arc<dyn HashFunction>> = vec![
            Arc::new(|_: &[u8]| 3u64),
            Arc::new(|data: &[u8]| data.len() as u64 + 100),
        ];
        let indexer = HashIndexer::new(hashers, 64);
        let indices: Vec<usize> = indexer.indices(b"abcd").collect();
        assert_eq!(indices, vec![3, 40]);
    }
}
