use anyhow::{ensure, Result};
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};

/// A `Sampler` decides which dataset items an epoch visits, and in what
/// order.
///
/// `iter(epoch)` must be deterministic for a given sampler and epoch, so the
/// loader can replay an epoch and so shuffles change from one epoch to the
/// next without any mutable state.
///
/// Implementations must be `Send + Sync` so the loader can share them.
pub trait Sampler: Send + Sync {
    type Item;

    fn iter(&self, epoch: usize) -> Box<dyn Iterator<Item = Self::Item> + Send + '_>;

    /// Number of items yielded per epoch.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: Sampler + ?Sized> Sampler for Box<S> {
    type Item = S::Item;

    fn iter(&self, epoch: usize) -> Box<dyn Iterator<Item = Self::Item> + Send + '_> {
        (**self).iter(epoch)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

/// ============================================================================
/// Yields indices in order `(0, 1, ..., dataset_size - 1)`.
///
/// ```ignore
/// let sampler = SequentialSampler::new(5);
/// let indices: Vec<_> = sampler.iter(0).collect();
/// assert_eq!(indices, vec![0, 1, 2, 3, 4]);
/// ```
#[derive(Debug, Clone)]
pub struct SequentialSampler {
    dataset_size: usize,
}

impl SequentialSampler {
    pub fn new(dataset_size: usize) -> Self {
        Self { dataset_size }
    }
}

impl Sampler for SequentialSampler {
    type Item = usize;

    fn iter(&self, _epoch: usize) -> Box<dyn Iterator<Item = usize> + Send + '_> {
        Box::new(0..self.dataset_size)
    }

    fn len(&self) -> usize {
        self.dataset_size
    }
}

/// ============================================================================
/// A fresh permutation of `0..dataset_size` every epoch.
///
/// The permutation for `epoch` is drawn from `StdRng::seed_from_u64(base_seed
/// + epoch)`: a fixed `base_seed` replays the same order run after run, and
/// consecutive epochs see different orders.
///
/// ```ignore
/// let sampler = RandomSampler::new(1000, 42);
/// let epoch0: Vec<_> = sampler.iter(0).collect();
/// let epoch1: Vec<_> = sampler.iter(1).collect(); // different order
/// ```
#[derive(Debug, Clone)]
pub struct RandomSampler {
    dataset_size: usize,
    base_seed: u64,
}

impl RandomSampler {
    pub fn new(dataset_size: usize, base_seed: u64) -> Self {
        Self {
            dataset_size,
            base_seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.base_seed
    }

    #[inline]
    fn derive_rng_for_epoch(&self, epoch: usize) -> StdRng {
        StdRng::seed_from_u64(self.base_seed.wrapping_add(epoch as u64))
    }
}

impl Sampler for RandomSampler {
    type Item = usize;

    fn iter(&self, epoch: usize) -> Box<dyn Iterator<Item = usize> + Send + '_> {
        let mut rng = self.derive_rng_for_epoch(epoch);
        let mut indices: Vec<_> = (0..self.dataset_size).collect();
        indices.shuffle(&mut rng);
        Box::new(indices.into_iter())
    }

    fn len(&self) -> usize {
        self.dataset_size
    }
}

/// ============================================================================
/// Groups the indices of another sampler into mini-batches of `batch_size`.
///
/// If `drop_last` is `true`, a final mini-batch smaller than `batch_size` is
/// discarded.
///
/// ```ignore
/// let batch_sampler = BatchSampler::new(SequentialSampler::new(1000), 32, false)?;
/// for mini_batch in batch_sampler.iter(0) {
///     // 31 batches of 32 indices, then one of 8
/// }
/// ```
#[derive(Debug, Clone)]
pub struct BatchSampler<S> {
    sampler: S,
    batch_size: usize,
    drop_last: bool,
}

impl<S: Sampler> BatchSampler<S> {
    pub fn new(sampler: S, batch_size: usize, drop_last: bool) -> Result<Self> {
        ensure!(
            batch_size > 0,
            "batch_size must be > 0, but got batch_size={}",
            batch_size
        );
        Ok(Self {
            sampler,
            batch_size,
            drop_last,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl<S: Sampler> Sampler for BatchSampler<S> {
    type Item = Vec<S::Item>;

    fn iter(&self, epoch: usize) -> Box<dyn Iterator<Item = Self::Item> + Send + '_> {
        let mut sampler_iter = self.sampler.iter(epoch);
        let batch_size = self.batch_size;
        let drop_last = self.drop_last;

        Box::new(std::iter::from_fn(move || {
            let mini_batch: Vec<_> = sampler_iter.by_ref().take(batch_size).collect();
            if mini_batch.len() == batch_size || (!drop_last && !mini_batch.is_empty()) {
                Some(mini_batch)
            } else {
                None
            }
        }))
    }

    /// Number of mini-batches per epoch.
    fn len(&self) -> usize {
        let items = self.sampler.len();
        if self.drop_last {
            items / self.batch_size
        } else {
            items.div_ceil(self.batch_size)
        }
    }
}
