//! In-memory test doubles for the engine's seams.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use stagedraw_types::{Participant, ParticipantPatch, Prize, PrizeBatch, PrizePatch};
use thiserror::Error;
use uuid::Uuid;

use crate::context::{Clock, Cue, Presenter, Store};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryStoreError {
    #[error("unknown prize {0}")]
    UnknownPrize(u64),
    #[error("unknown participant {0}")]
    UnknownParticipant(u64),
    #[error("injected store failure")]
    Injected,
}

#[derive(Debug, Default)]
struct MemoryInner {
    participants: BTreeMap<u64, Participant>,
    prizes: BTreeMap<u64, Prize>,
    current: Option<u64>,
    /// Remaining writes that succeed before every write fails.
    writes_before_failure: Option<usize>,
}

/// [`Store`] over in-process maps, with write-failure injection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new(participants: Vec<Participant>, prizes: Vec<Prize>) -> Self {
        let inner = MemoryInner {
            participants: participants.into_iter().map(|p| (p.id, p)).collect(),
            prizes: prizes.into_iter().map(|p| (p.id, p)).collect(),
            current: None,
            writes_before_failure: None,
        };
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Let `n` more writes succeed, then fail every write until cleared.
    pub fn set_fail_after(&self, n: usize) {
        self.inner.lock().unwrap().writes_before_failure = Some(n);
    }

    pub fn clear_failures(&self) {
        self.inner.lock().unwrap().writes_before_failure = None;
    }

    pub fn participants(&self) -> BTreeMap<u64, Participant> {
        self.inner.lock().unwrap().participants.clone()
    }

    pub fn prizes(&self) -> BTreeMap<u64, Prize> {
        self.inner.lock().unwrap().prizes.clone()
    }

    pub fn current(&self) -> Option<u64> {
        self.inner.lock().unwrap().current
    }

    fn check_write(inner: &mut MemoryInner) -> Result<(), MemoryStoreError> {
        match inner.writes_before_failure {
            Some(0) => Err(MemoryStoreError::Injected),
            Some(ref mut n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Store for MemoryStore {
    type Error = MemoryStoreError;

    async fn list_participants(&self) -> Result<Vec<Participant>, Self::Error> {
        Ok(self.inner.lock().unwrap().participants.values().cloned().collect())
    }

    async fn list_prizes(&self) -> Result<Vec<Prize>, Self::Error> {
        Ok(self.inner.lock().unwrap().prizes.values().cloned().collect())
    }

    async fn set_current_prize(&self, id: u64) -> Result<Prize, Self::Error> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_write(&mut inner)?;
        let prize = inner
            .prizes
            .get(&id)
            .cloned()
            .ok_or(MemoryStoreError::UnknownPrize(id))?;
        inner.current = Some(id);
        Ok(prize)
    }

    async fn update_prize(&self, id: u64, patch: PrizePatch) -> Result<Prize, Self::Error> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_write(&mut inner)?;
        let prize = inner
            .prizes
            .get_mut(&id)
            .ok_or(MemoryStoreError::UnknownPrize(id))?;
        if let Some(consumed) = patch.consumed {
            prize.consumed = consumed;
        }
        if let Some(completed) = patch.completed {
            prize.completed = completed;
        }
        if let Some(batches) = patch.batches {
            prize.batches = batches;
        }
        Ok(prize.clone())
    }

    async fn update_participant(
        &self,
        id: u64,
        patch: ParticipantPatch,
    ) -> Result<Participant, Self::Error> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_write(&mut inner)?;
        let participant = inner
            .participants
            .get_mut(&id)
            .ok_or(MemoryStoreError::UnknownParticipant(id))?;
        if let Some(has_won) = patch.has_won {
            participant.has_won = has_won;
        }
        if let Some(names) = patch.prize_names_won {
            participant.prize_names_won = names;
        }
        if let Some(ids) = patch.prize_ids_won {
            participant.prize_ids_won = ids;
        }
        if let Some(timestamps) = patch.win_timestamps_ms {
            participant.win_timestamps_ms = timestamps;
        }
        Ok(participant.clone())
    }
}

// Engines in tests borrow the store so assertions can read it afterwards.
impl Store for &MemoryStore {
    type Error = MemoryStoreError;

    async fn list_participants(&self) -> Result<Vec<Participant>, Self::Error> {
        <MemoryStore as Store>::list_participants(self).await
    }

    async fn list_prizes(&self) -> Result<Vec<Prize>, Self::Error> {
        <MemoryStore as Store>::list_prizes(self).await
    }

    async fn set_current_prize(&self, id: u64) -> Result<Prize, Self::Error> {
        <MemoryStore as Store>::set_current_prize(self, id).await
    }

    async fn update_prize(&self, id: u64, patch: PrizePatch) -> Result<Prize, Self::Error> {
        <MemoryStore as Store>::update_prize(self, id, patch).await
    }

    async fn update_participant(
        &self,
        id: u64,
        patch: ParticipantPatch,
    ) -> Result<Participant, Self::Error> {
        <MemoryStore as Store>::update_participant(self, id, patch).await
    }
}

/// Flattened record of one animation cue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CueRecord {
    Grid(usize),
    Sphere(usize),
    Spin,
    Reveal(usize),
}

/// [`Presenter`] that records cues instead of animating. Clones share the
/// same log, so a test can keep one while the engine owns another.
#[derive(Clone, Debug, Default)]
pub struct RecordingPresenter {
    cues: Arc<Mutex<Vec<CueRecord>>>,
}

impl RecordingPresenter {
    pub fn cues(&self) -> Vec<CueRecord> {
        self.cues.lock().unwrap().clone()
    }
}

impl Presenter for RecordingPresenter {
    async fn animate(&mut self, cue: Cue<'_>) {
        self.cues.lock().unwrap().push(match cue {
            Cue::Grid { slots } => CueRecord::Grid(slots.len()),
            Cue::Sphere { targets } => CueRecord::Sphere(targets.len()),
            Cue::Spin { .. } => CueRecord::Spin,
            Cue::Reveal { placements } => CueRecord::Reveal(placements.len()),
        });
    }
}

/// Manually advanced [`Clock`].
#[derive(Clone, Debug, Default)]
pub struct FixedClock {
    now_ms: Arc<AtomicU64>,
}

impl FixedClock {
    pub fn at(now_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(now_ms)),
        }
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// `n` participants with ids `1..=n` and no win history.
pub fn roster(n: usize) -> Vec<Participant> {
    (1..=n as u64)
        .map(|id| Participant {
            id,
            uuid: Uuid::new_v4(),
            name: format!("Guest {id}"),
            department: "Operations".to_string(),
            identity: "Staff".to_string(),
            badge: format!("B{id:03}"),
            has_won: false,
            prize_names_won: Vec::new(),
            prize_ids_won: Vec::new(),
            win_timestamps_ms: Vec::new(),
        })
        .collect()
}

/// A fresh unbatched prize.
pub fn prize(id: u64, name: &str, sort: u32, quota: u32) -> Prize {
    Prize {
        id,
        name: name.to_string(),
        sort,
        quota,
        consumed: 0,
        completed: false,
        draw_from_everyone: false,
        batching_enabled: false,
        batches: Vec::new(),
    }
}

/// A fresh prize split into batches; the quota is the batch sum.
pub fn batched_prize(id: u64, name: &str, sort: u32, batch_quotas: &[u32]) -> Prize {
    let mut p = prize(id, name, sort, batch_quotas.iter().sum());
    p.batching_enabled = true;
    p.batches = batch_quotas
        .iter()
        .enumerate()
        .map(|(i, &quota)| PrizeBatch {
            id: format!("batch-{}", i + 1),
            quota,
            consumed: 0,
        })
        .collect();
    p
}
