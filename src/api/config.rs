//! Sampler configuration.

use thiserror::Error;

/// Largest supported sample capacity. Slots are addressed by `u32`.
pub const MAX_CAPACITY: usize = (u32::MAX - 1) as usize;

/// Configuration for the object sampler.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Maximum number of retained samples (default: 256)
    pub capacity: usize,

    /// Frames to skip when recording allocation stack traces
    pub stack_skip_frames: usize,

    /// Create every sample slot up-front instead of on first use
    pub preallocate: bool,

    /// Reserved admission threshold, not used for gating
    pub threshold: usize,
}

/// Invalid sampler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The reservoir must hold at least one sample.
    #[error("sample capacity must be at least 1")]
    ZeroCapacity,

    /// Slot indices would not fit the handle type.
    #[error("sample capacity {requested} exceeds the maximum of {max}")]
    CapacityTooLarge {
        /// Requested capacity.
        requested: usize,
        /// Largest supported capacity.
        max: usize,
    },
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            stack_skip_frames: 0,
            preallocate: true,
            threshold: 0,
        }
    }
}

impl SamplerConfig {
    /// Create a minimal config for testing or constrained environments.
    pub fn minimal() -> Self {
        Self {
            capacity: 32,
            stack_skip_frames: 0,
            preallocate: false,
            threshold: 0,
        }
    }

    /// Create a config that keeps many more samples for detailed leak hunts.
    pub fn high_resolution() -> Self {
        Self {
            capacity: 4096,
            stack_skip_frames: 0,
            preallocate: true,
            threshold: 0,
        }
    }

    /// Builder pattern: set sample capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Builder pattern: set frames skipped when recording stack traces.
    pub fn with_stack_skip_frames(mut self, frames: usize) -> Self {
        self.stack_skip_frames = frames;
        self
    }

    /// Builder pattern: enable slot preallocation.
    pub fn with_preallocate(mut self, enable: bool) -> Self {
        self.preallocate = enable;
        self
    }

    /// Builder pattern: set the reserved threshold.
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.capacity > MAX_CAPACITY {
            return Err(ConfigError::CapacityTooLarge {
                requested: self.capacity,
                max: MAX_CAPACITY,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SamplerConfig::default().validate().is_ok());
        assert!(SamplerConfig::minimal().validate().is_ok());
        assert!(SamplerConfig::high_resolution().validate().is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = SamplerConfig::default().with_capacity(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroCapacity));
    }

    #[test]
    fn test_oversized_capacity_rejected() {
        let config = SamplerConfig::default().with_capacity(MAX_CAPACITY + 1);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CapacityTooLarge { .. })
        ));
    }
}
