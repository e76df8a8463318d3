//! Configuration for DataLoader behaviour.
//!
//! ```ignore
//! let config = LoaderConfig::builder()
//!     .batch_size(128)
//!     .num_workers(4)
//!     .shuffle(true)
//!     .drop_last(true)
//!     .seed(0)
//!     .build();
//! ```
//!
//! # Performance considerations:
//! - `num_workers`: more workers raise throughput and memory use
//! - `prefetch_factor`: batches in flight per worker; higher values reduce
//!   GPU starvation at the cost of memory

use anyhow::{ensure, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    /// Number of samples per batch.
    pub batch_size: usize,
    /// Number of worker threads (0 = load on the calling thread).
    pub num_workers: usize,
    /// Visit items in a fresh random order every epoch.
    pub shuffle: bool,
    /// Drop the final batch if it is smaller than `batch_size`.
    pub drop_last: bool,
    /// Copy finished batches into page-locked memory.
    pub pin_memory: bool,
    /// Parent seed for shuffling and worker RNGs. Drawn from the OS once per
    /// loader when absent.
    pub seed: Option<u64>,
    /// Batches in flight per worker.
    pub prefetch_factor: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 1,
            num_workers: 0,
            shuffle: false,
            drop_last: false,
            pin_memory: false,
            seed: None,
            prefetch_factor: 2,
        }
    }
}

impl LoaderConfig {
    pub fn builder() -> LoaderConfigBuilder {
        LoaderConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.batch_size > 0,
            "batch_size must be > 0, but got batch_size={}",
            self.batch_size
        );
        ensure!(
            self.num_workers == 0 || self.prefetch_factor > 0,
            "prefetch_factor must be > 0 when using workers"
        );
        Ok(())
    }
}

/// Builder for [`LoaderConfig`] with method chaining.
#[derive(Debug, Default)]
pub struct LoaderConfigBuilder {
    config: LoaderConfig,
}

impl LoaderConfigBuilder {
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    pub fn num_workers(mut self, workers: usize) -> Self {
        self.config.num_workers = workers;
        self
    }

    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.config.shuffle = shuffle;
        self
    }

    pub fn drop_last(mut self, drop: bool) -> Self {
        self.config.drop_last = drop;
        self
    }

    pub fn pin_memory(mut self, pin: bool) -> Self {
        self.config.pin_memory = pin;
        self
    }

    /// Sets the parent seed.
    ///
    /// When set, this seed controls:
    /// - Data shuffling (if shuffle = true)
    /// - Per-epoch worker seeds, and so every random transform
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn maybe_seed(mut self, seed: Option<u64>) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn prefetch_factor(mut self, factor: usize) -> Self {
        self.config.prefetch_factor = factor;
        self
    }

    pub fn build(self) -> LoaderConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_and_overrides() -> Result<()> {
        let config = LoaderConfig::builder().build();
        assert_eq!(config, LoaderConfig::default());
        config.validate()?;

        let config = LoaderConfig::builder()
            .batch_size(64)
            .num_workers(3)
            .shuffle(true)
            .pin_memory(true)
            .seed(9)
            .build();
        assert_eq!(config.batch_size, 64);
        assert_eq!(config.seed, Some(9));
        assert!(config.shuffle && config.pin_memory && !config.drop_last);
        Ok(())
    }

    #[test]
    fn test_validation() {
        assert!(LoaderConfig::builder().batch_size(0).build().validate().is_err());
        assert!(LoaderConfig::builder()
            .num_workers(2)
            .prefetch_factor(0)
            .build()
            .validate()
            .is_err());
    }
}
