//! Stagedraw draw core.
//!
//! This crate contains the fairness-preserving sampler, the deterministic
//! layout geometry, the quota ledger, and the draw state machine
//! (`DrawEngine`) used by the operator tooling.
//!
//! ## Determinism requirements
//! - Do not read wall-clock time inside the core; timestamps and deadlines
//!   come from the injected [`Clock`].
//! - Winner selection uses the OS random source (`OsRng`); everything else is
//!   deterministic given the same inputs.
//! - Win-history append order equals commit order and is stable for a given
//!   winner set.
//!
//! ## Persistence invariants
//! The core never persists its own state. All mutation flows through the
//! [`Store`] seam, and a failed store call must leave the in-memory snapshot
//! unadvanced so the operator can retry. The ledger's commit is resumable:
//! a per-session watermark guarantees each win-history entry is written
//! exactly once across retries.
//!
//! The primary entrypoint is [`DrawEngine`].

pub mod geometry;
pub mod ledger;
pub mod orchestrator;
pub mod sampler;

mod context;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;


pub use context::{Clock, Cue, Presenter, Snapshot, Store, SystemClock};
pub use ledger::{CommitOutcome, PendingDraw, QuotaLedger};
pub use orchestrator::{
    Continuation, DrawEngine, DrawError, EngineConfig, GuardViolation, Transition,
};
