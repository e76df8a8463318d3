//! Iterator implementations for DataLoader.
//!
//! - `DataLoaderIter`: the public iterator returned by `DataLoader::iter()`
//! - `IteratorImpl`: single-threaded or multi-threaded variant
//!
//! # Iterator Variants
//! - `Single`: batches are built on the calling thread, as worker 0, with a
//!   generator owned by the iterator
//! - `Multi`: fresh worker threads for this epoch; batches are assigned
//!   round-robin and yielded in sampler order
//!
//! Iteration ends when the sampler is exhausted. A batch whose transform
//! or collation fails is yielded as an `Err` and iteration continues with
//! the next batch.

use crate::collator::Collator;
use crate::dataset::InMemoryDataset;
use crate::minibatch::MiniBatch;
use anyhow::Result;
use rand::rngs::StdRng;
use std::collections::BTreeMap;

use super::common::thread::with_installed_rng;
use super::workers::inmemory::{process_batch, BatchResult, BatchTask};
use super::workers::pool::WorkerPool;

pub(crate) mod inmemory;

/// Shared configuration for both iterator variants.
struct IteratorConfig {
    epoch: usize,
    base_seed: u64,
    pin_memory: bool,
}

/// Iterator over the batches of one epoch.
///
/// Created by calling `dataloader.iter()`.
pub struct DataLoaderIter<'a, Raw, C> {
    config: IteratorConfig,
    inner: IteratorImpl<'a, Raw, C>,
}

enum IteratorImpl<'a, Raw, C> {
    Single {
        dataset: &'a InMemoryDataset<Raw>,
        collator: &'a C,
        batch_indices: Box<dyn Iterator<Item = Vec<usize>> + Send + 'a>,
        /// Seeded as worker 0 of the epoch; installed only while a batch is built.
        rng: StdRng,
    },

    /// - `in_flight`: batches sent to workers and not yet yielded
    /// - `next_to_send`: position of the next batch handed to a worker
    /// - `next_to_yield`: position of the next batch returned to the caller
    /// - `reorder`: finished batches that arrived ahead of `next_to_yield`
    Multi {
        pool: WorkerPool<BatchTask, BatchResult>,
        batch_indices: Box<dyn Iterator<Item = Vec<usize>> + Send + 'a>,
        max_in_flight: usize,
        in_flight: usize,
        next_to_send: usize,
        next_to_yield: usize,
        reorder: BTreeMap<usize, Result<MiniBatch>>,
    },
}

impl<'a, Raw, C> DataLoaderIter<'a, Raw, C> {
    /// Zero-based epoch this iterator belongs to.
    pub fn epoch(&self) -> usize {
        self.config.epoch
    }

    /// Base seed the workers of this epoch were derived from.
    pub fn base_seed(&self) -> u64 {
        self.config.base_seed
    }
}

impl<'a, Raw, C> Iterator for DataLoaderIter<'a, Raw, C>
where
    Raw: Clone + Send + Sync + 'static,
    C: Collator,
{
    type Item = Result<MiniBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        let config = &self.config;
        match &mut self.inner {
            IteratorImpl::Single {
                dataset,
                collator,
                batch_indices,
                rng,
            } => {
                let indices = batch_indices.next()?;
                Some(with_installed_rng(0, rng, || {
                    process_batch(*dataset, &indices, *collator, config.pin_memory)
                }))
            }

            IteratorImpl::Multi {
                pool,
                batch_indices,
                max_in_flight,
                in_flight,
                next_to_send,
                next_to_yield,
                reorder,
            } => {
                // Keep every worker busy up to the prefetch limit
                while *in_flight < *max_in_flight {
                    let Some(indices) = batch_indices.next() else {
                        break;
                    };
                    let worker_id = *next_to_send % pool.num_workers();
                    let task = BatchTask {
                        batch_index: *next_to_send,
                        indices,
                    };
                    if let Err(e) = pool.send(worker_id, task) {
                        return Some(Err(e.context(format!(
                            "Failed to send batch {} to worker {}",
                            *next_to_send, worker_id
                        ))));
                    }
                    *next_to_send += 1;
                    *in_flight += 1;
                }

                if *in_flight == 0 {
                    return None;
                }

                loop {
                    if let Some(result) = reorder.remove(&*next_to_yield) {
                        *next_to_yield += 1;
                        *in_flight -= 1;
                        return Some(result);
                    }
                    match pool.recv() {
                        Ok((batch_index, result)) => {
                            reorder.insert(batch_index, result);
                        }
                        Err(e) => {
                            // Nothing more can arrive; end the epoch after reporting.
                            batch_indices.by_ref().for_each(drop);
                            *in_flight = 0;
                            return Some(Err(e.context(format!(
                                "Failed to receive batch {} from workers",
                                *next_to_yield
                            ))));
                        }
                    }
                }
            }
        }
    }
}
