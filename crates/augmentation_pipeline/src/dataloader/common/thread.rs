//! Thread-local worker identity and random state.
//!
//! Every loader worker owns a private `StdRng`. Randomized primitives
//! (crop offset, flip decision, erasing and cutout geometry) draw from it
//! through [`with_worker_rng`], so no generator is ever shared between
//! workers and no lock is needed.
//!
//! A loader running on the caller thread keeps its generator outside the
//! thread-local slot and installs it only while it builds a batch (see
//! [`with_installed_rng`]). Two loaders iterated on one thread then keep
//! independent streams.
//!
//! Seed derivation: `worker_seed = base_seed + worker_id` (wrapping), where
//! `base_seed` is drawn once per epoch from the loader's parent generator.
//! Workers of one epoch therefore get distinct streams, consecutive epochs
//! get fresh ones, and a fixed parent seed replays everything.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::RefCell;

thread_local! {
    /// Ordinal of the loader worker running on this thread (0 outside workers).
    pub static WORKER_ID: RefCell<usize> = const { RefCell::new(0) };

    /// Worker-private generator used by randomized transforms.
    pub static WORKER_RNG: RefCell<Option<StdRng>> = const { RefCell::new(None) };
}

/// Derives the seed of one worker from the epoch's base seed.
#[inline]
pub fn worker_seed(base_seed: u64, worker_id: usize) -> u64 {
    base_seed.wrapping_add(worker_id as u64)
}

/// Reseeds the calling thread's generator with `seed`.
pub fn init_worker_rng(seed: u64) {
    WORKER_RNG.with(|rng| {
        *rng.borrow_mut() = Some(StdRng::seed_from_u64(seed));
    })
}

/// Marks the calling thread as worker `worker_id` and reseeds it from
/// `base_seed`. Called once when a worker starts.
pub fn init_worker(worker_id: usize, base_seed: u64) {
    WORKER_ID.with(|id| *id.borrow_mut() = worker_id);
    init_worker_rng(worker_seed(base_seed, worker_id));
}

/// Returns the ordinal of the worker running on this thread.
pub fn current_worker_id() -> usize {
    WORKER_ID.with(|id| *id.borrow())
}

/// Runs `f` with this thread's worker generator.
///
/// Outside a loader (no generator installed yet) an OS-seeded generator is
/// installed first, so transforms stay usable on their own.
pub fn with_worker_rng<T>(f: impl FnOnce(&mut StdRng) -> T) -> T {
    WORKER_RNG.with(|cell| {
        let mut slot = cell.borrow_mut();
        let rng = slot.get_or_insert_with(StdRng::from_os_rng);
        f(rng)
    })
}

/// Runs `f` as worker `worker_id` with `rng` installed as this thread's
/// generator, then restores the previous identity and generator.
///
/// `rng` is advanced by every draw `f` makes.
pub fn with_installed_rng<T>(worker_id: usize, rng: &mut StdRng, f: impl FnOnce() -> T) -> T {
    let previous_id = WORKER_ID.with(|id| id.replace(worker_id));
    let previous_rng = WORKER_RNG.with(|cell| cell.replace(Some(rng.clone())));

    let output = f();

    if let Some(advanced) = WORKER_RNG.with(|cell| cell.replace(previous_rng)) {
        *rng = advanced;
    }
    WORKER_ID.with(|id| *id.borrow_mut() = previous_id);
    output
}

/// Draws a bool that is `true` with probability `p`.
pub fn worker_gen_bool(p: f64) -> bool {
    use rand::Rng as _;
    with_worker_rng(|rng| rng.random_bool(p))
}
