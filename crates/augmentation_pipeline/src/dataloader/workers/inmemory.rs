//! Workers for `InMemoryDataset`.
//!
//! Workers share the dataset through `Arc`, receive batches of indices,
//! transform each item with their own RNG and collate the results.
//!
//! Batches are assigned round-robin by batch position, so for a given
//! base seed the same worker (and therefore the same RNG stream) handles
//! the same batches on every run.

use crate::collator::Collator;
use crate::dataset::InMemoryDataset;
use crate::minibatch::MiniBatch;
use crate::sample::Sample;
use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{Receiver, Sender};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use super::pool::WorkerPool;
use crate::dataloader::common::thread::current_worker_id;

/// One batch of dataset indices, tagged with its position in the epoch.
#[derive(Debug)]
pub(crate) struct BatchTask {
    pub(crate) batch_index: usize,
    pub(crate) indices: Vec<usize>,
}

/// A finished batch, tagged so the iterator can restore sampler order.
pub(crate) type BatchResult = (usize, Result<MiniBatch>);

/// Spawns the workers of one epoch.
pub(crate) fn spawn_workers<Raw, C>(
    dataset: Arc<InMemoryDataset<Raw>>,
    collator: Arc<C>,
    num_workers: usize,
    prefetch_factor: usize,
    pin_memory: bool,
    base_seed: u64,
) -> Result<WorkerPool<BatchTask, BatchResult>>
where
    Raw: Clone + Send + Sync + 'static,
    C: Collator + 'static,
{
    WorkerPool::new(
        num_workers,
        prefetch_factor,
        base_seed,
        move |worker_id, task_rx: Receiver<BatchTask>, output_tx: Sender<BatchResult>| {
            for task in task_rx {
                let result =
                    process_batch(dataset.as_ref(), &task.indices, collator.as_ref(), pin_memory)
                        .with_context(|| {
                            format!(
                                "Worker {} failed to process batch {} ({} indices)",
                                worker_id,
                                task.batch_index,
                                task.indices.len()
                            )
                        });
                if output_tx.send((task.batch_index, result)).is_err() {
                    break;
                }
            }
            tracing::trace!(worker_id, "loader worker finished");
        },
    )
    .context("Failed to create worker pool for in-memory dataset")
}

/// Fetches, transforms and collates one batch.
///
/// Used by both worker threads and single-threaded iteration. A panic
/// raised inside a tensor operation is reported as an error for this
/// batch instead of tearing down the worker.
pub(crate) fn process_batch<Raw, C>(
    dataset: &InMemoryDataset<Raw>,
    indices: &[usize],
    collator: &C,
    pin_memory: bool,
) -> Result<MiniBatch>
where
    Raw: Clone,
    C: Collator + ?Sized,
{
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let samples = indices
            .iter()
            .map(|&index| {
                dataset.get_sample(index).with_context(|| {
                    format!(
                        "Failed to load sample at index {} (dataset size: {})",
                        index,
                        dataset.len()
                    )
                })
            })
            .collect::<Result<Vec<Sample>>>()?;

        let batch = collator
            .collate(&samples)
            .with_context(|| format!("Failed to collate batch of {} samples", samples.len()))?;

        if pin_memory {
            batch.pin_memory()
        } else {
            Ok(batch)
        }
    }));

    outcome.unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| payload.downcast_ref::<&str>().copied())
            .unwrap_or("unknown panic");
        Err(anyhow!(
            "Transform panicked in worker {}: {}",
            current_worker_id(),
            message
        ))
    })
}
