//! The `DataLoader` and its constructors.
//!
//! The loader picks its sampler from `config.shuffle`:
//! - `shuffle = false`: `SequentialSampler`
//! - `shuffle = true`: `RandomSampler` seeded with the loader seed
//!
//! # Seed Coordination
//!
//! One loader seed (`config.seed`, or a single OS draw at construction)
//! drives everything random:
//!
//! ```text
//! loader seed ──► parent StdRng ──(one draw per epoch)──► base_seed
//!                                                           │
//!                                   worker i: base_seed + i ◄┘
//! ```
//!
//! The shuffle order of epoch `e` comes from `RandomSampler(loader seed)`.
//! Two loaders built with the same seed therefore replay identical
//! batches, augmentations included.

use crate::collator::{Collator, StackCollator};
use crate::dataset::InMemoryDataset;
use crate::sampler::{BatchSampler, RandomSampler, Sampler, SequentialSampler};
use anyhow::{anyhow, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::config::LoaderConfig;

pub(crate) type IndexBatchSampler = BatchSampler<Box<dyn Sampler<Item = usize>>>;

/// Coordinates an [`InMemoryDataset`], a sampler and a [`Collator`] to
/// produce [`MiniBatch`](crate::minibatch::MiniBatch)es.
///
/// # Thread safety:
/// - `DataLoader` is `Send + Sync`.
/// - Iterators borrow the loader and stay on the thread that created them.
///
/// # Type parameters:
/// - `Raw`: undecorated dataset item
/// - `C`: Collator type (defaults to StackCollator)
pub struct DataLoader<Raw, C = StackCollator> {
    pub(crate) dataset: Arc<InMemoryDataset<Raw>>,
    pub(crate) collator: Arc<C>,
    pub(crate) config: LoaderConfig,
    pub(crate) batch_sampler: IndexBatchSampler,
    pub(crate) seed: u64,
    pub(crate) parent_rng: Mutex<StdRng>,
    pub(crate) current_epoch: AtomicUsize,
}

impl<Raw> DataLoader<Raw, StackCollator>
where
    Raw: Clone + Send + Sync + 'static,
{
    /// Creates a loader with the default [`StackCollator`].
    ///
    /// ```ignore
    /// let config = LoaderConfig::builder()
    ///     .batch_size(32)
    ///     .shuffle(true)
    ///     .seed(42)
    ///     .build();
    /// let dataloader = DataLoader::new(dataset, config)?;
    /// ```
    pub fn new(dataset: InMemoryDataset<Raw>, config: LoaderConfig) -> Result<Self> {
        Self::new_with_collator(dataset, StackCollator, config)
    }
}

impl<Raw, C> DataLoader<Raw, C>
where
    Raw: Clone + Send + Sync + 'static,
    C: Collator + 'static,
{
    pub fn new_with_collator(
        dataset: InMemoryDataset<Raw>,
        collator: C,
        config: LoaderConfig,
    ) -> Result<Self> {
        config.validate().context("Invalid loader configuration")?;

        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let sampler: Box<dyn Sampler<Item = usize>> = if config.shuffle {
            Box::new(RandomSampler::new(dataset.len(), seed))
        } else {
            Box::new(SequentialSampler::new(dataset.len()))
        };
        let batch_sampler = BatchSampler::new(sampler, config.batch_size, config.drop_last)?;

        tracing::debug!(
            items = dataset.len(),
            batches = batch_sampler.len(),
            batch_size = config.batch_size,
            num_workers = config.num_workers,
            shuffle = config.shuffle,
            seed,
            "created data loader"
        );

        Ok(Self {
            dataset: Arc::new(dataset),
            collator: Arc::new(collator),
            batch_sampler,
            parent_rng: Mutex::new(StdRng::seed_from_u64(seed)),
            current_epoch: AtomicUsize::new(0),
            seed,
            config,
        })
    }

    /// Number of batches per epoch.
    pub fn len(&self) -> usize {
        self.batch_sampler.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn dataset(&self) -> &InMemoryDataset<Raw> {
        &self.dataset
    }

    /// The resolved loader seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of epochs started so far.
    pub fn epoch(&self) -> usize {
        self.current_epoch.load(Ordering::SeqCst)
    }

    /// Draws the base seed of the next epoch from the parent generator.
    pub(crate) fn next_base_seed(&self) -> Result<u64> {
        let mut rng = self
            .parent_rng
            .lock()
            .map_err(|_| anyhow!("Loader RNG lock poisoned"))?;
        Ok(rng.random())
    }
}
