//! Worker pool for parallel batch loading.
//!
//! Each worker owns a private task channel, so the main thread decides
//! which worker handles which batch. Combined with per-worker seeding this
//! makes random transforms reproducible regardless of thread scheduling.
//!
//! # Key features
//! - Bounded channels prevent memory bloat
//! - Graceful shutdown on drop
//! - Thread-local worker IDs and RNGs installed before the worker body runs

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use crate::dataloader::common::thread::init_worker;

/// Thread pool with one task channel per worker and a shared output channel.
///
/// # Type Parameters
/// - `Task`: Work items sent to workers
/// - `Output`: Results returned from workers
pub(crate) struct WorkerPool<Task, Output> {
    workers: Vec<thread::JoinHandle<()>>,
    task_txs: Vec<Sender<Task>>,
    output_rx: Option<Receiver<Output>>,
}

impl<Task, Output> WorkerPool<Task, Output>
where
    Task: Send + 'static,
    Output: Send + 'static,
{
    /// Spawns `num_workers` threads. Worker `i` is seeded with
    /// `worker_seed(base_seed, i)` before `worker_fn` runs.
    pub(crate) fn new<F>(
        num_workers: usize,
        buffer_size: usize,
        base_seed: u64,
        worker_fn: F,
    ) -> Result<Self>
    where
        F: Fn(usize, Receiver<Task>, Sender<Output>) + Send + Sync + 'static,
    {
        if num_workers == 0 {
            return Err(anyhow!(
                "Cannot create WorkerPool with 0 workers. \
                Either set num_workers > 0 or use single-threaded mode."
            ));
        }
        if buffer_size == 0 {
            return Err(anyhow!(
                "Cannot create WorkerPool with buffer_size 0. \
                Buffer size must be > 0 to prevent deadlocks."
            ));
        }

        let (output_tx, output_rx) = bounded(buffer_size * num_workers);
        let worker_fn = Arc::new(worker_fn);
        let mut workers = Vec::with_capacity(num_workers);
        let mut task_txs = Vec::with_capacity(num_workers);

        for worker_id in 0..num_workers {
            let (task_tx, task_rx) = bounded(buffer_size);
            let output_tx = output_tx.clone();
            let worker_fn = Arc::clone(&worker_fn);

            let handle = thread::Builder::new()
                .name(format!("dataloader-worker-{}", worker_id))
                .spawn(move || {
                    init_worker(worker_id, base_seed);
                    worker_fn(worker_id, task_rx, output_tx);
                })
                .with_context(|| format!("Failed to spawn worker thread {}", worker_id))?;

            workers.push(handle);
            task_txs.push(task_tx);
        }

        tracing::debug!(num_workers, base_seed, "spawned loader workers");
        Ok(Self {
            workers,
            task_txs,
            output_rx: Some(output_rx),
        })
    }

    pub(crate) fn num_workers(&self) -> usize {
        self.task_txs.len()
    }

    /// Routes a task to one specific worker.
    pub(crate) fn send(&self, worker_id: usize, task: Task) -> Result<()> {
        let tx = self
            .task_txs
            .get(worker_id)
            .ok_or_else(|| anyhow!("No worker with id {}", worker_id))?;
        tx.send(task)
            .map_err(|_| anyhow!("Worker {} channel closed", worker_id))
    }

    /// Blocks until any worker delivers a result.
    pub(crate) fn recv(&self) -> Result<Output> {
        self.output_rx
            .as_ref()
            .ok_or_else(|| anyhow!("Worker pool is shut down"))?
            .recv()
            .map_err(|_| anyhow!("Worker channel disconnected - workers may have crashed"))
    }
}

impl<Task, Output> Drop for WorkerPool<Task, Output> {
    fn drop(&mut self) {
        // Closing the task channels ends each worker loop; closing the output
        // channel releases any worker blocked on a send.
        self.task_txs.clear();
        self.output_rx.take();

        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::warn!("loader worker panicked during shutdown");
            }
        }
    }
}
