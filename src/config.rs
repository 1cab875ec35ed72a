//! Heap configuration
//!
//! Tunables for the collection threshold policy. The defaults match the
//! original design: start collecting at 1 MiB and regrow the threshold to
//! 1.5x the live size after every cycle.

use thiserror::Error;

/// Default collection threshold: 1 MiB of live bytes.
pub const DEFAULT_INITIAL_THRESHOLD: usize = 1024 * 1024;

/// Default threshold growth factor applied after each collection.
pub const DEFAULT_GROWTH_FACTOR: f64 = 1.5;

/// Configuration errors reported by [`Heap::with_config`](crate::Heap::with_config).
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// The initial threshold must be non-zero.
    #[error("initial threshold must be non-zero")]
    ZeroThreshold,

    /// The growth factor must be finite and at least 1.0.
    #[error("growth factor must be finite and >= 1.0, got {0}")]
    InvalidGrowthFactor(f64),
}

/// Threshold policy configuration for a [`Heap`](crate::Heap).
#[derive(Debug, Clone, Copy)]
pub struct HeapConfig {
    /// Byte watermark that triggers the first automatic collection. Also
    /// the floor the threshold never drops below afterwards.
    pub initial_threshold: usize,

    /// Multiplier applied to the post-sweep live size to pick the next
    /// threshold.
    pub growth_factor: f64,
}

impl HeapConfig {
    /// Check the configuration for values the threshold policy cannot
    /// work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if !self.growth_factor.is_finite() || self.growth_factor < 1.0 {
            return Err(ConfigError::InvalidGrowthFactor(self.growth_factor));
        }
        Ok(())
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            initial_threshold: DEFAULT_INITIAL_THRESHOLD,
            growth_factor: DEFAULT_GROWTH_FACTOR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = HeapConfig::default();
        assert_eq!(config.initial_threshold, 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let config = HeapConfig {
            initial_threshold: 0,
            ..HeapConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroThreshold));
    }

    #[test]
    fn test_shrinking_growth_factor_rejected() {
        let config = HeapConfig {
            growth_factor: 0.5,
            ..HeapConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidGrowthFactor(0.5))
        );
    }

    #[test]
    fn test_nan_growth_factor_rejected() {
        let config = HeapConfig {
            growth_factor: f64::NAN,
            ..HeapConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
