use thiserror::Error;

pub type Result<T> = std::result::Result<T, FilterError>;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Expected number of items must be greater than 0")]
    ZeroExpectedItems,

    #[error(
        "False positive rate must be between 0 and 1 (exclusive), got {rate}"
    )]
    InvalidFalsePositiveRate { rate: f64 },

    #[error("Bit array size must be greater than 0")]
    ZeroBitSize,

    #[error("Bit array size {bits} exceeds the addressable maximum")]
    BitSizeTooLarge { bits: f64 },

    #[error("Decay rate must be between 0 and 1 (inclusive), got {rate}")]
    InvalidDecayRate { rate: f64 },

    #[error("Decay interval must be greater than 0")]
    ZeroDecayInterval,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to spawn decay task: {0}")]
    DecaySpawn(#[from] std::io::Error),
}

impl From<crate::config::StableFilterConfigBuilderError> for FilterError {
    fn from(err: crate::config::StableFilterConfigBuilderError) -> Self {
        FilterError::InvalidConfig(err.to_string())
    }
}
