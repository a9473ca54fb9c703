//! Common types used throughout stagedraw.
//!
//! The draw core (`stagedraw-engine`) and the store adapter
//! (`stagedraw-client`) share these records. Wire casing (the backend speaks
//! snake_case JSON) never appears here; the adapter translates at its
//! boundary.

mod constants;
mod participant;
mod phase;
mod prize;

pub use constants::*;
pub use participant::{Participant, ParticipantInvariantError, ParticipantPatch};
pub use phase::DrawPhase;
pub use prize::{Prize, PrizeBatch, PrizeInvariantError, PrizePatch};
