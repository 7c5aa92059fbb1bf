use crate::error::{FilterError, Result};
use crate::hash::{optimal_bit_vector_size, optimal_num_hashes};
use derive_builder::Builder;
use std::time::Duration;

pub const DEFAULT_DECAY_RATE: f64 = 0.01;
pub const DEFAULT_DECAY_INTERVAL: Duration = Duration::from_secs(60);

/// Capacity-driven filter configuration.
///
/// `decay_rate == 0.0` and a zero `decay_interval` are treated as "use the
/// default" (0.01 and one minute). Build a filter with an explicit bit size
/// through [`StableBloomFilter::new`](crate::StableBloomFilter::new) if a
/// non-decaying filter is wanted.
#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct StableFilterConfig {
    /// Number of elements expected to be live at once
    #[builder(default = "1_000_000")]
    pub expected_items: usize,

    /// Target false positive rate (0.0 to 1.0, exclusive)
    #[builder(default = "0.01")]
    pub false_positive_rate: f64,

    /// Probability that a set bit is cleared during one decay cycle
    #[builder(default = "DEFAULT_DECAY_RATE")]
    pub decay_rate: f64,

    /// Time between decay cycles
    #[builder(default = "DEFAULT_DECAY_INTERVAL")]
    pub decay_interval: Duration,

    /// Base seed for decay workers, `None` draws one from OS entropy
    #[builder(default = "None")]
    pub seed: Option<u64>,

    /// Number of decay workers, `None` uses available parallelism
    #[builder(default = "None")]
    pub decay_workers: Option<usize>,
}

impl StableFilterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.expected_items == 0 {
            return Err(FilterError::ZeroExpectedItems);
        }
        if !(self.false_positive_rate > 0.0 && self.false_positive_rate < 1.0) {
            return Err(FilterError::InvalidFalsePositiveRate {
                rate: self.false_positive_rate,
            });
        }
        if !(0.0..=1.0).contains(&self.decay_rate) {
            return Err(FilterError::InvalidDecayRate {
                rate: self.decay_rate,
            });
        }
        if self.decay_workers == Some(0) {
            return Err(FilterError::InvalidConfig(
                "Decay workers must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn effective_decay_rate(&self) -> f64 {
        if self.decay_rate == 0.0 {
            DEFAULT_DECAY_RATE
        } else {
            self.decay_rate
        }
    }

    pub fn effective_decay_interval(&self) -> Duration {
        if self.decay_interval.is_zero() {
            DEFAULT_DECAY_INTERVAL
        } else {
            self.decay_interval
        }
    }
}

/// Bit size and hash count derived from a [`StableFilterConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterParams {
    pub bit_vector_size: usize,
    pub num_hashes: usize,
}

impl TryFrom<&StableFilterConfig> for FilterParams {
    type Error = FilterError;

    fn try_from(config: &StableFilterConfig) -> Result<Self> {
        let bit_vector_size = optimal_bit_vector_size(
            config.expected_items,
            config.false_positive_rate,
        )?;
        let num_hashes =
            optimal_num_hashes(bit_vector_size, config.expected_items)?;

        Ok(Self {
            bit_vector_size,
            // A filter needs at least one probe per element
            num_hashes: num_hashes.max(1),
        })
    }
}
