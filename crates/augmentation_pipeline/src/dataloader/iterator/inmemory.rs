//! `DataLoader::iter()`: starts one epoch.
//!
//! The variant depends on the configuration:
//! - `num_workers = 0`: `IteratorImpl::Single`
//! - `num_workers > 0`: `IteratorImpl::Multi`, with fresh workers

use crate::collator::Collator;
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::{DataLoaderIter, IteratorConfig, IteratorImpl};
use crate::dataloader::common::thread::worker_seed;
use crate::dataloader::loader::DataLoader;
use crate::dataloader::workers::inmemory::spawn_workers;
use crate::sampler::Sampler;

impl<Raw, C> DataLoader<Raw, C>
where
    Raw: Clone + Send + Sync + 'static,
    C: Collator + 'static,
{
    /// Creates an iterator over the batches of the next epoch.
    ///
    /// Every call starts a new epoch: the shuffle order (if enabled) and
    /// the worker seeds both change, while a loader rebuilt with the same
    /// seed replays the same sequence of epochs.
    pub fn iter(&self) -> Result<DataLoaderIter<'_, Raw, C>> {
        let epoch = self.current_epoch.fetch_add(1, Ordering::SeqCst);
        let base_seed = self.next_base_seed()?;
        let batch_indices = self.batch_sampler.iter(epoch);

        tracing::debug!(
            epoch,
            base_seed,
            batches = self.len(),
            num_workers = self.config.num_workers,
            "starting epoch"
        );

        let config = IteratorConfig {
            epoch,
            base_seed,
            pin_memory: self.config.pin_memory,
        };

        let inner = if self.config.num_workers == 0 {
            IteratorImpl::Single {
                dataset: self.dataset.as_ref(),
                collator: self.collator.as_ref(),
                batch_indices,
                rng: StdRng::seed_from_u64(worker_seed(base_seed, 0)),
            }
        } else {
            let pool = spawn_workers(
                Arc::clone(&self.dataset),
                Arc::clone(&self.collator),
                self.config.num_workers,
                self.config.prefetch_factor,
                self.config.pin_memory,
                base_seed,
            )
            .with_context(|| format!("Failed to start workers for epoch {}", epoch))?;

            IteratorImpl::Multi {
                pool,
                batch_indices,
                max_in_flight: self.config.num_workers * self.config.prefetch_factor,
                in_flight: 0,
                next_to_send: 0,
                next_to_yield: 0,
                reorder: BTreeMap::new(),
            }
        };

        Ok(DataLoaderIter { config, inner })
    }
}
