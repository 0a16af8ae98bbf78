//! Configuration for replaykit
//!
//! Centralized configuration with sensible defaults.

use crate::error::{ReplayError, Result};

/// Main configuration for a replay buffer instance
#[derive(Debug, Clone)]
pub struct BufferConfig {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Fixed capacity of the buffer (number of records held at once)
    pub mem_size: usize,

    // -------------------------------------------------------------------------
    // Sampling Configuration
    // -------------------------------------------------------------------------
    /// Seed for the sampling RNG. `None` seeds from OS entropy.
    pub seed: Option<u64>,

    // -------------------------------------------------------------------------
    // Snapshot Configuration
    // -------------------------------------------------------------------------
    /// Zstd level used for snapshot archive entries (1..=22)
    pub compression_level: i32,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            mem_size: 100_000,
            seed: None,
            compression_level: 3,
        }
    }
}

impl BufferConfig {
    /// Create a new config builder
    pub fn builder() -> BufferConfigBuilder {
        BufferConfigBuilder::default()
    }

    /// Check the config for values no buffer can work with
    pub fn validate(&self) -> Result<()> {
        if self.mem_size == 0 {
            return Err(ReplayError::Config(
                "mem_size must be greater than zero".to_string(),
            ));
        }
        if !(1..=22).contains(&self.compression_level) {
            return Err(ReplayError::Config(format!(
                "compression_level must be in 1..=22, got {}",
                self.compression_level
            )));
        }
        Ok(())
    }
}

/// Builder for BufferConfig
#[derive(Default)]
pub struct BufferConfigBuilder {
    config: BufferConfig,
}

impl BufferConfigBuilder {
    /// Set the buffer capacity
    pub fn mem_size(mut self, mem_size: usize) -> Self {
        self.config.mem_size = mem_size;
        self
    }

    /// Set a fixed seed for reproducible sampling
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Set the zstd level for snapshot archives
    pub fn compression_level(mut self, level: i32) -> Self {
        self.config.compression_level = level;
        self
    }

    pub fn build(self) -> BufferConfig {
        self.config
    }
}
