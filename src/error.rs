//! Configuration errors.

use thiserror::Error;

/// Error returned when tuning values are rejected or cannot be parsed.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value that must be strictly positive was zero, negative or NaN.
    #[error("`{field}` must be positive, got {value}")]
    NotPositive { field: &'static str, value: f32 },

    /// A value that must be zero or greater was negative or NaN.
    #[error("`{field}` must not be negative, got {value}")]
    Negative { field: &'static str, value: f32 },

    /// Lower bound of a range is above its upper bound.
    #[error("`{low}` ({low_value}) must not exceed `{high}` ({high_value})")]
    InvertedRange {
        low: &'static str,
        low_value: f32,
        high: &'static str,
        high_value: f32,
    },

    /// A sample count that must be at least one was zero, or the sample counts are inverted.
    #[error("`{field}` must be at least {min}, got {value}")]
    TooFewSamples {
        field: &'static str,
        min: usize,
        value: usize,
    },

    /// A response curve contains a non-finite sample.
    #[error("response curve sample {index} is not finite")]
    NonFiniteSample { index: usize },

    /// Tuning could not be parsed from JSON.
    #[error("failed to parse tuning: {0}")]
    Parse(#[from] serde_json::Error),
}

pub(crate) fn ensure_positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

pub(crate) fn ensure_non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

pub(crate) fn ensure_ordered(
    low: &'static str,
    low_value: f32,
    high: &'static str,
    high_value: f32,
) -> Result<(), ConfigError> {
    if low_value <= high_value {
        Ok(())
    } else {
        Err(ConfigError::InvertedRange {
            low,
            low_value,
            high,
            high_value,
        })
    }
}
