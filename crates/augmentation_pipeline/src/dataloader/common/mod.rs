//! Utilities shared by the loader and its workers.

pub mod thread;
