use std::sync::atomic::{AtomicU64, Ordering};

/// Number of bits held by one storage word.
pub const WORD_BITS: usize = u64::BITS as usize;

/// Largest length an array can be created with.
pub const MAX_BITS: usize = usize::MAX & !(WORD_BITS - 1);

/// Fixed-size bit array backed by atomic 64-bit words.
///
/// Bit operations are lock-free and safe to call from any number of threads.
/// Whole-word `load_word`/`store_word` exist for the decay path, which
/// rewrites one word at a time.
pub struct AtomicBitArray {
    words: Box<[AtomicU64]>,
    len: usize,
}

impl AtomicBitArray {
    /// Creates a zeroed array holding at least `bits` bits.
    ///
    /// The length is rounded up to the next multiple of [`WORD_BITS`].
    ///
    /// # Panics
    ///
    /// If `bits` is greater than [`MAX_BITS`].
    pub fn new(bits: usize) -> Self {
        assert!(bits <= MAX_BITS, "bit array length {bits} exceeds MAX_BITS");
        let num_words = bits.div_ceil(WORD_BITS);
        let words = (0..num_words).map(|_| AtomicU64::new(0)).collect();
        Self {
            words,
            len: num_words * WORD_BITS,
        }
    }

    /// Total number of addressable bits.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn num_words(&self) -> usize {
        self.words.len()
    }

    #[inline]
    fn locate(pos: usize) -> (usize, u64) {
        (pos / WORD_BITS, 1u64 << (pos % WORD_BITS))
    }

    /// Sets bit `pos` with an atomic fetch-or, so concurrent writers to the
    /// same word never lose each other's bits.
    ///
    /// Panics if `pos >= self.len()`.
    #[inline]
    pub fn set_bit(&self, pos: usize) {
        let (word, mask) = Self::locate(pos);
        self.words[word].fetch_or(mask, Ordering::AcqRel);
    }

    /// Reads bit `pos`.
    ///
    /// Panics if `pos >= self.len()`.
    #[inline]
    pub fn get_bit(&self, pos: usize) -> bool {
        let (word, mask) = Self::locate(pos);
        self.words[word].load(Ordering::Acquire) & mask != 0
    }

    pub fn load_word(&self, index: usize) -> u64 {
        self.words[index].load(Ordering::Acquire)
    }

    pub fn store_word(&self, index: usize, value: u64) {
        self.words[index].store(value, Ordering::Release);
    }

    /// Population count across all words.
    ///
    /// Each word is read atomically, the total is not a consistent snapshot
    /// when writers or decay run concurrently.
    pub fn count_set_bits(&self) -> usize {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }
}

impl std::fmt::Debug for AtomicBitArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicBitArray")
            .field("len", &self.len)
            .field("num_words", &self.words.len())
            .field("set_bits", &self.count_set_bits())
            .finish()
    }
}
