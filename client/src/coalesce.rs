//! Write coalescing for bursty patch traffic.
//!
//! Bulk operations (imports, resets) can stage many small patches against the
//! same record. [`PatchBuffer`] merges them per record, last writer wins per
//! field, so one flush sends at most one request per touched record.

use std::collections::BTreeMap;

use stagedraw_engine::Store;
use stagedraw_types::{ParticipantPatch, PrizePatch};
use tracing::debug;

#[derive(Debug, Default)]
pub struct PatchBuffer {
    participants: BTreeMap<u64, ParticipantPatch>,
    prizes: BTreeMap<u64, PrizePatch>,
}

impl PatchBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty() && self.prizes.is_empty()
    }

    /// Number of records a flush would touch.
    pub fn staged(&self) -> usize {
        self.participants.len() + self.prizes.len()
    }

    pub fn stage_participant(&mut self, id: u64, patch: ParticipantPatch) {
        let entry = self.participants.entry(id).or_default();
        if patch.has_won.is_some() {
            entry.has_won = patch.has_won;
        }
        if patch.prize_names_won.is_some() {
            entry.prize_names_won = patch.prize_names_won;
        }
        if patch.prize_ids_won.is_some() {
            entry.prize_ids_won = patch.prize_ids_won;
        }
        if patch.win_timestamps_ms.is_some() {
            entry.win_timestamps_ms = patch.win_timestamps_ms;
        }
    }

    pub fn stage_prize(&mut self, id: u64, patch: PrizePatch) {
        let entry = self.prizes.entry(id).or_default();
        if patch.consumed.is_some() {
            entry.consumed = patch.consumed;
        }
        if patch.completed.is_some() {
            entry.completed = patch.completed;
        }
        if patch.batches.is_some() {
            entry.batches = patch.batches;
        }
    }

    /// Send every staged patch, participants first. A failed write leaves it
    /// and everything after it staged for the next flush.
    pub async fn flush<S: Store>(&mut self, store: &S) -> Result<usize, S::Error> {
        let mut written = 0;

        let participant_ids: Vec<u64> = self.participants.keys().copied().collect();
        for id in participant_ids {
            let patch = self.participants.get(&id).cloned().unwrap_or_default();
            if !patch.is_empty() {
                store.update_participant(id, patch).await?;
                written += 1;
            }
            self.participants.remove(&id);
        }

        let prize_ids: Vec<u64> = self.prizes.keys().copied().collect();
        for id in prize_ids {
            let patch = self.prizes.get(&id).cloned().unwrap_or_default();
            if !patch.is_empty() {
                store.update_prize(id, patch).await?;
                written += 1;
            }
            self.prizes.remove(&id);
        }

        debug!(written, "flushed coalesced patches");
        Ok(written)
    }
}
