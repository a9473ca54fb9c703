//! Draw session state machine.
//!
//! One engine instance drives one stage through the
//! `Idle -> Armed -> Running -> Revealed` cycle. Every externally triggered
//! transition funnels through a single-flight lock: while a transition cue is
//! animating, further calls are ignored rather than queued, so a double-click
//! can never overlap two draws.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use stagedraw_types::{DrawPhase, Participant, WINNER_LAYOUT_MAX};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::context::{Clock, Cue, Presenter, Snapshot, Store};
use crate::geometry::{
    grid_slots, pick_free_slot, sphere_points, winner_placements, CardSize, GridSlot, LayoutError,
    SlotPickError, SpherePoint, WindowSize, WinnerPlacement,
};
use crate::ledger::{CommitOutcome, PendingDraw, QuotaLedger};
use crate::sampler;

/// Stage and pacing knobs for one event.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cards per grid row.
    pub row_width: usize,
    pub card_size: CardSize,
    pub window_size: WindowSize,
    /// Force a stop this long after the spin starts, if set.
    pub definite_time_ms: Option<u64>,
    /// Most winners revealed in one round.
    pub draw_cap: usize,
    pub spin_turns: f64,
    pub spin_duration_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            row_width: 17,
            card_size: CardSize {
                width: 140.0,
                height: 180.0,
            },
            window_size: WindowSize {
                width: 1920.0,
                height: 1080.0,
            },
            definite_time_ms: None,
            draw_cap: stagedraw_types::SINGLE_DRAW_CAP,
            spin_turns: 10.0,
            spin_duration_ms: 3_000,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.row_width == 0 {
            return Err("row_width must be at least 1");
        }
        if self.draw_cap == 0 {
            return Err("draw_cap must be at least 1");
        }
        if self.draw_cap > WINNER_LAYOUT_MAX {
            return Err("draw_cap exceeds the largest reveal layout");
        }
        Ok(())
    }
}

/// Whether an externally triggered transition took effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// Dropped by the single-flight lock or an idempotency guard.
    Ignored,
}

/// Result of a continue request.
#[derive(Debug)]
pub enum Continuation {
    Ignored,
    Committed(CommitOutcome),
}

/// A rejected transition, with enough context for the operator console.
#[derive(Debug, Error)]
pub enum GuardViolation {
    #[error("no prize is selected for drawing")]
    NoCurrentPrize,
    #[error("prize {name} is already completed{}", next_hint(.next))]
    PrizeCompleted {
        name: String,
        next: Option<String>,
    },
    #[error("prize {name} has no remaining quota{}", next_hint(.next))]
    QuotaExhausted {
        name: String,
        next: Option<String>,
    },
    #[error("prize {name} has an unusable quota of {quota}")]
    InvalidQuota { name: String, quota: u32 },
    #[error("prize {name} needs {needed} candidates but only {available} are eligible")]
    InsufficientCandidates {
        name: String,
        needed: usize,
        available: usize,
    },
    #[error("cannot {action} while the draw is {phase}")]
    WrongPhase {
        action: &'static str,
        phase: DrawPhase,
    },
    #[error(transparent)]
    Slots(#[from] SlotPickError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

fn next_hint(next: &Option<String>) -> String {
    match next {
        Some(name) => format!(" (next open prize: {name})"),
        None => String::new(),
    }
}

#[derive(Debug, Error)]
pub enum DrawError<E: std::error::Error> {
    #[error(transparent)]
    Guard(#[from] GuardViolation),
    #[error("store request failed: {0}")]
    Store(#[source] E),
}

/// Winners and layout for the round in flight.
#[derive(Debug)]
struct DrawSession {
    pending: PendingDraw,
    slots: Vec<usize>,
    placements: Vec<WinnerPlacement>,
}

/// The draw orchestrator.
pub struct DrawEngine<S, P, C> {
    store: S,
    presenter: P,
    clock: C,
    config: EngineConfig,
    snapshot: Snapshot,
    phase: DrawPhase,
    /// Single-flight lock held across transition cues.
    locked: bool,
    session: Option<DrawSession>,
    /// Grid slots already holding a revealed card this round cycle.
    used_slots: HashSet<usize>,
    deadline_ms: Option<u64>,
    grid: Vec<GridSlot>,
    sphere_targets: Vec<SpherePoint>,
    phase_tx: watch::Sender<DrawPhase>,
}

impl<S: Store, P: Presenter, C: Clock> DrawEngine<S, P, C> {
    pub fn new(
        store: S,
        presenter: P,
        clock: C,
        config: EngineConfig,
    ) -> Result<Self, &'static str> {
        config.validate()?;
        let (phase_tx, _) = watch::channel(DrawPhase::Idle);
        Ok(Self {
            store,
            presenter,
            clock,
            config,
            snapshot: Snapshot::default(),
            phase: DrawPhase::Idle,
            locked: false,
            session: None,
            used_slots: HashSet::new(),
            deadline_ms: None,
            grid: Vec::new(),
            sphere_targets: Vec::new(),
            phase_tx,
        })
    }

    /// Load the event from the store, compute the stage layouts, and seat the
    /// cards in the grid. Resolves the current prize to the first open one.
    pub async fn load(&mut self) -> Result<(), DrawError<S::Error>> {
        self.snapshot = Snapshot::load(&self.store)
            .await
            .map_err(DrawError::Store)?;
        for participant in &self.snapshot.participants {
            if let Err(error) = participant.validate_invariants() {
                warn!(participant = participant.id, %error, "invalid participant record");
            }
        }
        for prize in &self.snapshot.prizes {
            if let Err(error) = prize.validate_invariants() {
                warn!(prize = prize.id, %error, "invalid prize record");
            }
        }

        self.grid = grid_slots(self.snapshot.participants.len(), self.config.row_width);
        self.sphere_targets = sphere_points(self.grid.len());

        if let Some(first) = self.snapshot.first_open_prize().map(|p| p.id) {
            let stored = self
                .store
                .set_current_prize(first)
                .await
                .map_err(DrawError::Store)?;
            self.snapshot.adopt_prize(stored);
            self.snapshot.current_prize = Some(first);
        }
        info!(
            participants = self.snapshot.participants.len(),
            prizes = self.snapshot.prizes.len(),
            current = ?self.snapshot.current_prize,
            "event loaded"
        );

        self.presenter.animate(Cue::Grid { slots: &self.grid }).await;
        Ok(())
    }

    /// Scatter the cards onto the sphere, readying a draw.
    pub async fn arm(&mut self) -> Result<Transition, DrawError<S::Error>> {
        if self.locked {
            debug!("arm ignored: transition in flight");
            return Ok(Transition::Ignored);
        }
        self.guard_phase("arm", DrawPhase::Idle)?;
        self.to_sphere().await;
        Ok(Transition::Applied)
    }

    /// Sample winners for the current prize and start the spin.
    ///
    /// The prize list is re-read first so out-of-band quota edits are seen.
    /// The lock is not held during the spin; [`stop`](Self::stop) stays
    /// reachable while the sphere turns.
    pub async fn start(&mut self) -> Result<Transition, DrawError<S::Error>> {
        if self.locked {
            debug!("start ignored: transition in flight");
            return Ok(Transition::Ignored);
        }
        self.guard_phase("start", DrawPhase::Armed)?;

        let prizes = self.store.list_prizes().await.map_err(DrawError::Store)?;
        self.snapshot.refresh_prizes(prizes);

        let prize = self
            .snapshot
            .current_prize()
            .cloned()
            .ok_or(GuardViolation::NoCurrentPrize)?;
        let next = self
            .snapshot
            .prizes
            .iter()
            .find(|p| p.is_open() && p.id != prize.id)
            .map(|p| p.name.clone());
        if prize.completed {
            return Err(GuardViolation::PrizeCompleted {
                name: prize.name,
                next,
            }
            .into());
        }
        if prize.quota == 0 {
            return Err(GuardViolation::InvalidQuota {
                name: prize.name,
                quota: 0,
            }
            .into());
        }
        if prize.consumed >= prize.quota {
            return Err(GuardViolation::QuotaExhausted {
                name: prize.name,
                next,
            }
            .into());
        }
        if let Some((batch_sum, quota)) = prize.batch_drift() {
            warn!(prize = %prize.name, batch_sum, quota, "batch quotas disagree with prize quota");
        }

        let pool = self.snapshot.candidate_pool(&prize);
        let remaining = prize.effective_remaining() as usize;
        if pool.len() < remaining {
            return Err(GuardViolation::InsufficientCandidates {
                name: prize.name,
                needed: remaining,
                available: pool.len(),
            }
            .into());
        }

        let round = remaining.min(self.config.draw_cap);
        let winners = sampler::sample(&pool, round);
        info!(prize = %prize.name, winners = round, pool = pool.len(), "draw started");
        self.session = Some(DrawSession {
            pending: PendingDraw::new(prize.id, winners),
            slots: Vec::new(),
            placements: Vec::new(),
        });
        if let Some(limit) = self.config.definite_time_ms {
            self.deadline_ms = Some(self.clock.now_ms() + limit);
        }
        self.set_phase(DrawPhase::Running);
        self.presenter
            .animate(Cue::Spin {
                turns: self.config.spin_turns,
                duration_ms: self.config.spin_duration_ms,
            })
            .await;
        Ok(Transition::Applied)
    }

    /// End the spin and fly the winners to their reveal placements.
    ///
    /// A stop while already revealed is ignored, so a late forced stop after
    /// a manual one is harmless.
    pub async fn stop(&mut self) -> Result<Transition, DrawError<S::Error>> {
        if self.locked {
            debug!("stop ignored: transition in flight");
            return Ok(Transition::Ignored);
        }
        if self.phase == DrawPhase::Revealed {
            return Ok(Transition::Ignored);
        }
        self.guard_phase("stop", DrawPhase::Running)?;
        self.deadline_ms = None;

        let count = match &self.session {
            Some(session) => session.pending.count(),
            None => {
                return Err(GuardViolation::WrongPhase {
                    action: "stop",
                    phase: self.phase,
                }
                .into())
            }
        };
        let mut slots = Vec::with_capacity(count);
        for _ in 0..count {
            let slot =
                pick_free_slot(&self.used_slots, self.grid.len()).map_err(GuardViolation::from)?;
            self.used_slots.insert(slot);
            slots.push(slot);
        }
        let placements =
            winner_placements(count, self.config.card_size, self.config.window_size)
                .map_err(GuardViolation::from)?;
        if let Some(session) = self.session.as_mut() {
            session.slots = slots;
            session.placements = placements;
        }

        self.locked = true;
        let placements = self
            .session
            .as_ref()
            .map(|s| s.placements.as_slice())
            .unwrap_or(&[]);
        self.presenter.animate(Cue::Reveal { placements }).await;
        self.locked = false;
        self.set_phase(DrawPhase::Revealed);
        Ok(Transition::Applied)
    }

    /// Commit the revealed winners and re-arm for the next round.
    ///
    /// On a store failure the engine stays in `Revealed` with the pending
    /// draw intact; calling again resumes the commit where it stopped.
    pub async fn continue_draw(&mut self) -> Result<Continuation, DrawError<S::Error>> {
        if self.locked {
            debug!("continue ignored: transition in flight");
            return Ok(Continuation::Ignored);
        }
        self.guard_phase("continue", DrawPhase::Revealed)?;
        let Some(session) = self.session.as_mut() else {
            return Err(GuardViolation::WrongPhase {
                action: "continue",
                phase: self.phase,
            }
            .into());
        };

        self.locked = true;
        let ledger = QuotaLedger::new(&self.store, &self.clock);
        let result = ledger.commit(&mut self.snapshot, &mut session.pending).await;
        match result {
            Err(error) => {
                self.locked = false;
                warn!(%error, "draw commit failed; staying revealed for retry");
                Err(DrawError::Store(error))
            }
            Ok(outcome) => {
                self.session = None;
                self.locked = false;
                self.to_sphere().await;
                Ok(Continuation::Committed(outcome))
            }
        }
    }

    /// Abandon the session and return every card to the grid.
    ///
    /// An uncommitted draw is discarded without touching the store; winners
    /// were never announced as persisted.
    pub async fn quit(&mut self) -> Result<Transition, DrawError<S::Error>> {
        if self.locked {
            debug!("quit ignored: transition in flight");
            return Ok(Transition::Ignored);
        }
        if self.phase == DrawPhase::Idle {
            return Ok(Transition::Ignored);
        }
        if let Some(session) = self.session.take() {
            info!(
                prize = session.pending.prize_id,
                winners = session.pending.count(),
                "discarding uncommitted draw"
            );
        }
        self.deadline_ms = None;
        self.used_slots.clear();
        self.locked = true;
        self.presenter.animate(Cue::Grid { slots: &self.grid }).await;
        self.locked = false;
        self.set_phase(DrawPhase::Idle);
        Ok(Transition::Applied)
    }

    /// Force a stop once the configured time limit passes. Call this from the
    /// host's timer loop; it is a no-op in every other state.
    pub async fn tick(&mut self) -> Result<Transition, DrawError<S::Error>> {
        if self.phase != DrawPhase::Running || self.locked {
            return Ok(Transition::Ignored);
        }
        match self.deadline_ms {
            Some(deadline) if self.clock.now_ms() >= deadline => {
                info!("draw time limit reached; forcing a stop");
                self.stop().await
            }
            _ => Ok(Transition::Ignored),
        }
    }

    /// Point the stage at a different prize. Only between rounds.
    pub async fn select_prize(&mut self, id: u64) -> Result<Transition, DrawError<S::Error>> {
        if self.locked {
            return Ok(Transition::Ignored);
        }
        if !matches!(self.phase, DrawPhase::Idle | DrawPhase::Armed) {
            return Err(GuardViolation::WrongPhase {
                action: "select a prize",
                phase: self.phase,
            }
            .into());
        }
        let stored = self
            .store
            .set_current_prize(id)
            .await
            .map_err(DrawError::Store)?;
        info!(prize = %stored.name, "current prize selected");
        self.snapshot.adopt_prize(stored);
        self.snapshot.current_prize = Some(id);
        Ok(Transition::Applied)
    }

    /// Clear all recorded wins and quota progress. Only from `Idle`.
    pub async fn reset(&mut self) -> Result<Transition, DrawError<S::Error>> {
        if self.locked {
            return Ok(Transition::Ignored);
        }
        self.guard_phase("reset", DrawPhase::Idle)?;
        let ledger = QuotaLedger::new(&self.store, &self.clock);
        ledger
            .reset(&mut self.snapshot)
            .await
            .map_err(DrawError::Store)?;
        Ok(Transition::Applied)
    }

    pub fn phase(&self) -> DrawPhase {
        self.phase
    }

    /// Phase updates for the host UI; the receiver sees every transition.
    pub fn subscribe_phases(&self) -> watch::Receiver<DrawPhase> {
        self.phase_tx.subscribe()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Winners of the round in flight, empty outside a session.
    pub fn pending_winners(&self) -> &[Participant] {
        self.session
            .as_ref()
            .map(|s| s.pending.winners.as_slice())
            .unwrap_or(&[])
    }

    /// Grid slots assigned to the revealed winners this round.
    pub fn winner_slots(&self) -> &[usize] {
        self.session
            .as_ref()
            .map(|s| s.slots.as_slice())
            .unwrap_or(&[])
    }

    /// Reveal placements for the winners this round, empty before a stop.
    pub fn winner_placements(&self) -> &[WinnerPlacement] {
        self.session
            .as_ref()
            .map(|s| s.placements.as_slice())
            .unwrap_or(&[])
    }

    pub fn grid(&self) -> &[GridSlot] {
        &self.grid
    }

    pub fn sphere_targets(&self) -> &[SpherePoint] {
        &self.sphere_targets
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn to_sphere(&mut self) {
        self.locked = true;
        self.used_slots.clear();
        self.presenter
            .animate(Cue::Sphere {
                targets: &self.sphere_targets,
            })
            .await;
        self.locked = false;
        self.set_phase(DrawPhase::Armed);
    }

    fn guard_phase(&self, action: &'static str, expected: DrawPhase) -> Result<(), GuardViolation> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(GuardViolation::WrongPhase {
                action,
                phase: self.phase,
            })
        }
    }

    fn set_phase(&mut self, phase: DrawPhase) {
        if self.phase != phase {
            debug!(from = %self.phase, to = %phase, "phase transition");
            self.phase = phase;
            self.phase_tx.send_replace(phase);
        }
    }
}
