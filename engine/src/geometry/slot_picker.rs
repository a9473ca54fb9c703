use std::collections::HashSet;

use rand::{rngs::OsRng, Rng};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlotPickError {
    #[error("all {capacity} grid slots are occupied")]
    Exhausted { capacity: usize },
}

/// Random attempts before falling back to a linear scan.
const RANDOM_ATTEMPTS: usize = 64;

/// Pick a random grid slot not in `used`.
///
/// Returned slots accumulate in `used` across a session so revealed winner
/// cards never land on top of each other. Rejection sampling with a bounded
/// attempt count, then a wrapping linear scan from a random offset; never
/// recursive, terminates for any occupancy.
pub fn pick_free_slot(used: &HashSet<usize>, pool_len: usize) -> Result<usize, SlotPickError> {
    pick_free_slot_with(&mut OsRng, used, pool_len)
}

/// [`pick_free_slot`] with an explicit random source, for deterministic tests.
pub fn pick_free_slot_with<R: Rng>(
    rng: &mut R,
    used: &HashSet<usize>,
    pool_len: usize,
) -> Result<usize, SlotPickError> {
    if pool_len == 0 || used.len() >= pool_len {
        return Err(SlotPickError::Exhausted { capacity: pool_len });
    }
    for _ in 0..RANDOM_ATTEMPTS {
        let candidate = rng.gen_range(0..pool_len);
        if !used.contains(&candidate) {
            return Ok(candidate);
        }
    }
    // Dense occupancy; walk from a random offset instead of rolling again.
    let start = rng.gen_range(0..pool_len);
    for step in 0..pool_len {
        let candidate = (start + step) % pool_len;
        if !used.contains(&candidate) {
            return Ok(candidate);
        }
    }
    Err(SlotPickError::Exhausted { capacity: pool_len })
}
