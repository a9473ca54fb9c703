//! Uniform winner sampling.
//!
//! A draw must be a uniform k-subset of the candidate pool: every participant
//! equally likely, no bias toward list order, and no way to pre-compute the
//! result from a weak generator's seed. Selection therefore runs a partial
//! Fisher–Yates shuffle over a working copy, driven by the OS random source.

use rand::{rngs::OsRng, Rng};

/// Draw `k` distinct elements from `pool`, each k-subset equally likely.
///
/// Pure over its arguments; callers hand in a copy of the live candidate
/// pool and remove the returned winners themselves. `k` larger than the pool
/// is clamped to the pool size.
pub fn sample<T: Clone>(pool: &[T], k: usize) -> Vec<T> {
    sample_with(&mut OsRng, pool, k)
}

/// [`sample`] with an explicit random source, for deterministic tests.
pub fn sample_with<R: Rng, T: Clone>(rng: &mut R, pool: &[T], k: usize) -> Vec<T> {
    let mut remaining: Vec<T> = pool.to_vec();
    let k = k.min(remaining.len());
    let mut picked = Vec::with_capacity(k);
    for _ in 0..k {
        let index = rng.gen_range(0..remaining.len());
        picked.push(remaining.swap_remove(index));
    }
    picked
}
