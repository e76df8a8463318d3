//! The `DataLoader`.
//!
//! The `DataLoader` coordinates an `InMemoryDataset`, a `Sampler` and a
//! `Collator` to produce batches, optionally on worker threads.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌─────────────────┐
//!                  │ InMemoryDataset │ (Arc-shared raw items)
//!                  └────────┬────────┘
//!                           │
//!                  ┌────────▼────────┐
//!                  │    Transform    │ (Raw → Sample, worker RNG)
//!                  └────────┬────────┘
//!                           │
//!                    ┌──────▼──────┐
//!                    │   Sampler   │ (order of indices per epoch)
//!                    └──────┬──────┘
//!                           │
//!                  ┌────────▼────────┐
//!                  │   DataLoader    │ ←── LoaderConfig (batch size, workers, seed)
//!                  └────────┬────────┘
//!                           │
//!                  [Worker Threads] (fresh each epoch, seeded base_seed + id)
//!                           │
//!                    ┌──────▼──────┐
//!                    │  Collator   │ (stack samples)
//!                    └──────┬──────┘
//!                           │
//!                    ┌──────▼──────┐
//!                    │  MiniBatch  │ (yielded in sampler order)
//!                    └─────────────┘
//! ```
//!
//! # Module Structure
//!
//! ```text
//! src/dataloader/
//! ├── mod.rs             # Public API exports
//! ├── config.rs          # LoaderConfig and builder
//! ├── loader.rs          # DataLoader struct, constructors, seed handling
//! ├── iterator/
//! │   ├── mod.rs         # DataLoaderIter and batch ordering
//! │   └── inmemory.rs    # DataLoader::iter()
//! ├── workers/
//! │   ├── pool.rs        # WorkerPool with per-worker task channels
//! │   └── inmemory.rs    # Batch tasks and batch processing
//! └── common/
//!     └── thread.rs      # Thread-local worker ID and RNG
//! ```
//!
//! # Example Usage
//!
//! ```ignore
//! let dataset = InMemoryDataset::new(images).with_transform(composed);
//! let config = LoaderConfig::builder()
//!     .batch_size(128)
//!     .num_workers(4)
//!     .shuffle(true)
//!     .seed(0)
//!     .build();
//!
//! let dataloader = DataLoader::new(dataset, config)?;
//! for epoch in 0..epochs {
//!     for batch in dataloader.iter()? {
//!         let batch: MiniBatch = batch?;
//!         // batch.images()?, batch.labels()?
//!     }
//! }
//! ```
//!
//! ## Memory Usage
//! - Single-threaded: O(batch_size)
//! - Multi-threaded: O(num_workers x prefetch_factor x batch_size)

mod common;
mod config;
mod iterator;
mod loader;
mod workers;

pub use config::{LoaderConfig, LoaderConfigBuilder};
pub use iterator::DataLoaderIter;
pub use loader::DataLoader;

pub use common::thread::{
    current_worker_id, init_worker, init_worker_rng, with_worker_rng, worker_gen_bool,
    worker_seed,
};
