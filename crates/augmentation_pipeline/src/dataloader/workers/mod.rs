//! Worker management for parallel data loading.
//!
//! - `pool`: generic worker pool with per-worker task channels
//! - `inmemory`: batch tasks and batch processing for indexed datasets

pub(crate) mod inmemory;
pub(crate) mod pool;
