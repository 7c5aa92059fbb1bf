use std::time::Duration;

/// Core membership operations.
///
/// All methods take `&self`: the filter is shared across threads as-is and
/// every operation is built from atomic word operations.
pub trait StableBloomFilterOps {
    /// Sets the bits for `item`. Re-inserting a present item changes nothing.
    fn insert(&self, item: &[u8]);

    /// `false` means the item is definitely absent. `true` means probably
    /// present: either inserted and not yet decayed, or a false positive.
    fn contains(&self, item: &[u8]) -> bool;

    /// Reports whether `item` was probably present and inserts it if not.
    ///
    /// The check and the insert are separate atomic steps, two threads racing
    /// on the same new item may both observe `false`.
    fn contains_or_insert(&self, item: &[u8]) -> bool;
}

pub trait BulkStableBloomFilterOps {
    fn insert_bulk(&self, items: &[&[u8]]);
    fn contains_bulk(&self, items: &[&[u8]]) -> Vec<bool>;
}

/// Read-only introspection. Values computed from the bit array are
/// approximate while inserts or decay run concurrently.
pub trait StableBloomFilterStats {
    fn bit_size(&self) -> usize;
    fn num_hashes(&self) -> usize;
    fn decay_rate(&self) -> f64;
    fn decay_interval(&self) -> Duration;
    fn count_set_bits(&self) -> usize;
    fn fill_ratio(&self) -> f64;
    /// `(set_bits / bit_size) ^ k`
    fn estimate_false_positive_rate(&self) -> f64;
    /// Number of decay cycles completed so far, manual ones included.
    fn decay_cycles(&self) -> u64;
}
