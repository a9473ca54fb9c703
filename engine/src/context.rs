//! Seams between the draw core and its collaborators.
//!
//! The engine receives explicit handles at construction instead of reaching
//! for process-wide singletons, so unit tests run fully isolated: a
//! [`Store`] for the remote data store, a [`Presenter`] for the visual
//! layer, and a [`Clock`] for timestamps and deadlines.

use std::time::{SystemTime, UNIX_EPOCH};

use stagedraw_types::{Participant, ParticipantPatch, Prize, PrizePatch};

use crate::geometry::{GridSlot, SpherePoint, WinnerPlacement};

/// Remote data store, treated as a black box.
///
/// Updates are partial: the core sends only the fields it changed, and the
/// returned record is authoritative (server-side merge wins).
// The engine drives these futures from one task; no Send bound is required.
#[allow(async_fn_in_trait)]
pub trait Store {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn list_participants(&self) -> Result<Vec<Participant>, Self::Error>;

    async fn list_prizes(&self) -> Result<Vec<Prize>, Self::Error>;

    /// Mark one prize current server-side. Idempotent.
    async fn set_current_prize(&self, id: u64) -> Result<Prize, Self::Error>;

    async fn update_prize(&self, id: u64, patch: PrizePatch) -> Result<Prize, Self::Error>;

    async fn update_participant(
        &self,
        id: u64,
        patch: ParticipantPatch,
    ) -> Result<Participant, Self::Error>;
}

/// A staging instruction for the presentation layer.
///
/// Each cue's `await` is a suspension point; the engine holds its
/// single-flight lock across transition cues (`Sphere`, `Reveal`, `Grid`).
/// `Spin` starts a looping spin and resolves once the spin is underway, so
/// the stop transition stays reachable while the ball turns.
#[derive(Debug)]
pub enum Cue<'a> {
    /// Return every card to its flat grid slot.
    Grid { slots: &'a [GridSlot] },
    /// Scatter cards onto the sphere ahead of a draw.
    Sphere { targets: &'a [SpherePoint] },
    /// Spin the sphere.
    Spin { turns: f64, duration_ms: u64 },
    /// Fly the pending winners to their reveal placements.
    Reveal { placements: &'a [WinnerPlacement] },
}

/// Presentation/animation adapter. Not part of the core; the engine only
/// hands it target positions and awaits completion.
// The engine drives these futures from one task; no Send bound is required.
#[allow(async_fn_in_trait)]
pub trait Presenter {
    async fn animate(&mut self, cue: Cue<'_>);
}

/// Time source for win timestamps and the draw deadline.
pub trait Clock {
    /// Milliseconds since the unix epoch.
    fn now_ms(&self) -> u64;
}

/// Wall-clock backed [`Clock`] for production use.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// One mutable snapshot of the event's roster and prize list.
///
/// Refreshed from the store at session start; the prize list is additionally
/// re-read immediately before each spin to catch out-of-band CRUD changes.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub participants: Vec<Participant>,
    /// Sorted by `sort` ascending.
    pub prizes: Vec<Prize>,
    /// Id of the current prize, if any prize is armed for drawing.
    pub current_prize: Option<u64>,
}

impl Snapshot {
    /// Read a full snapshot from the store. The current prize is resolved
    /// separately by the orchestrator.
    pub async fn load<S: Store>(store: &S) -> Result<Self, S::Error> {
        let participants = store.list_participants().await?;
        let mut prizes = store.list_prizes().await?;
        prizes.sort_by_key(|p| p.sort);
        Ok(Self {
            participants,
            prizes,
            current_prize: None,
        })
    }

    /// Replace the prize list with a fresh read, keeping sort order.
    pub fn refresh_prizes(&mut self, mut prizes: Vec<Prize>) {
        prizes.sort_by_key(|p| p.sort);
        self.prizes = prizes;
        if let Some(current) = self.current_prize {
            if !self.prizes.iter().any(|p| p.id == current) {
                self.current_prize = None;
            }
        }
    }

    pub fn prize(&self, id: u64) -> Option<&Prize> {
        self.prizes.iter().find(|p| p.id == id)
    }

    pub fn participant(&self, id: u64) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn current_prize(&self) -> Option<&Prize> {
        self.current_prize.and_then(|id| self.prize(id))
    }

    /// First prize in sort order still eligible for drawing.
    pub fn first_open_prize(&self) -> Option<&Prize> {
        self.prizes.iter().find(|p| p.is_open())
    }

    pub fn all_finished(&self) -> bool {
        self.first_open_prize().is_none()
    }

    /// Adopt an authoritative prize record returned by the store.
    pub fn adopt_prize(&mut self, prize: Prize) {
        match self.prizes.iter_mut().find(|p| p.id == prize.id) {
            Some(slot) => *slot = prize,
            None => {
                self.prizes.push(prize);
                self.prizes.sort_by_key(|p| p.sort);
            }
        }
    }

    /// Adopt an authoritative participant record returned by the store.
    pub fn adopt_participant(&mut self, participant: Participant) {
        match self
            .participants
            .iter_mut()
            .find(|p| p.id == participant.id)
        {
            Some(slot) => *slot = participant,
            None => self.participants.push(participant),
        }
    }

    /// Build the candidate pool for a prize.
    ///
    /// `draw_from_everyone` excludes only winners of *this* prize; otherwise
    /// anyone who has won anything is excluded.
    pub fn candidate_pool(&self, prize: &Prize) -> Vec<Participant> {
        self.participants
            .iter()
            .filter(|p| {
                if prize.draw_from_everyone {
                    !p.has_won_prize(prize.id)
                } else {
                    !p.has_won
                }
            })
            .cloned()
            .collect()
    }
}
