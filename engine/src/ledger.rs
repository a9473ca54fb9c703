//! Quota bookkeeping and draw commit.
//!
//! Committing a draw is a multi-write against a remote store that can fail
//! between writes. [`PendingDraw`] carries a persistence watermark so a
//! retried commit resumes after the last acknowledged write instead of
//! double-counting winners. All patches are absolute values, so re-sending
//! one is harmless.

use stagedraw_types::{Participant, ParticipantPatch, Prize, PrizePatch};
use tracing::{debug, info, warn};

use crate::context::{Clock, Snapshot, Store};

/// Winners sampled for the current round, not yet (fully) persisted.
#[derive(Clone, Debug)]
pub struct PendingDraw {
    pub prize_id: u64,
    /// Pre-win copies of the sampled participants.
    pub winners: Vec<Participant>,
    /// Winners whose records the store has acknowledged.
    persisted: usize,
    /// True once the prize record update has been acknowledged.
    prize_updated: bool,
}

impl PendingDraw {
    pub fn new(prize_id: u64, winners: Vec<Participant>) -> Self {
        Self {
            prize_id,
            winners,
            persisted: 0,
            prize_updated: false,
        }
    }

    pub fn count(&self) -> usize {
        self.winners.len()
    }
}

/// Result of a fully committed draw round.
#[derive(Clone, Debug)]
pub struct CommitOutcome {
    /// Authoritative prize record after the round.
    pub prize: Prize,
    /// The prize closed this round (quota reached or batch-final).
    pub prize_completed: bool,
    /// Prize auto-advanced to, if the current one closed.
    pub next_prize: Option<u64>,
    /// No open prize remains anywhere.
    pub all_finished: bool,
}

/// Persists draw results and walks the prize sequence.
pub struct QuotaLedger<'a, S, C> {
    store: &'a S,
    clock: &'a C,
}

impl<'a, S: Store, C: Clock> QuotaLedger<'a, S, C> {
    pub fn new(store: &'a S, clock: &'a C) -> Self {
        Self { store, clock }
    }

    /// Persist a pending draw: winner records first, then the prize counters,
    /// then auto-advance if the prize closed.
    ///
    /// Safe to retry with the same `pending` after an error; acknowledged
    /// writes are skipped on the next attempt.
    pub async fn commit(
        &self,
        snapshot: &mut Snapshot,
        pending: &mut PendingDraw,
    ) -> Result<CommitOutcome, S::Error> {
        let prize_name = snapshot
            .prize(pending.prize_id)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        let now_ms = self.clock.now_ms();

        while pending.persisted < pending.winners.len() {
            let mut winner = pending.winners[pending.persisted].clone();
            winner.record_win(&prize_name, pending.prize_id, now_ms);
            let patch = ParticipantPatch::win_state(&winner);
            let stored = self.store.update_participant(winner.id, patch).await?;
            snapshot.adopt_participant(stored);
            pending.persisted += 1;
        }

        if !pending.prize_updated {
            // The snapshot prize is still the pre-commit baseline; every
            // acknowledged write replaces it with the server's record.
            let mut updated = snapshot
                .prize(pending.prize_id)
                .cloned()
                .unwrap_or_else(|| missing_prize(pending.prize_id));
            let round = pending.winners.len() as u32;
            if let Some(batch) = updated.first_open_batch_mut() {
                batch.consumed = (batch.consumed + round).min(batch.quota);
            }
            updated.consumed = (updated.consumed + round).min(updated.quota);
            let newly_completed = !updated.completed && updated.consumed >= updated.quota;
            if newly_completed {
                updated.completed = true;
            }

            let patch = PrizePatch {
                consumed: Some(updated.consumed),
                completed: newly_completed.then_some(true),
                batches: updated
                    .batching_enabled
                    .then(|| updated.batches.clone()),
            };
            let stored = self.store.update_prize(updated.id, patch).await?;
            info!(
                prize = %stored.name,
                winners = round,
                consumed = stored.consumed,
                quota = stored.quota,
                "draw committed"
            );
            snapshot.adopt_prize(stored);
            pending.prize_updated = true;
        }

        let prize = snapshot
            .prize(pending.prize_id)
            .cloned()
            .unwrap_or_else(|| missing_prize(pending.prize_id));
        let prize_completed = !prize.is_open();

        let mut next_prize = None;
        if prize_completed {
            match snapshot.first_open_prize().map(|p| p.id) {
                Some(next) => {
                    let stored = self.store.set_current_prize(next).await?;
                    snapshot.adopt_prize(stored);
                    snapshot.current_prize = Some(next);
                    next_prize = Some(next);
                    info!(from = %prize.name, to = next, "advanced to next prize");
                }
                None => {
                    snapshot.current_prize = None;
                    info!("all prizes drawn");
                }
            }
        }

        Ok(CommitOutcome {
            prize,
            prize_completed,
            next_prize,
            all_finished: snapshot.all_finished(),
        })
    }

    /// Wipe all draw progress: every participant's win state and every
    /// prize's counters, then point the store back at the first prize.
    pub async fn reset(&self, snapshot: &mut Snapshot) -> Result<(), S::Error> {
        let winner_ids: Vec<u64> = snapshot
            .participants
            .iter()
            .filter(|p| p.has_won)
            .map(|p| p.id)
            .collect();
        for id in winner_ids {
            let stored = self
                .store
                .update_participant(id, ParticipantPatch::cleared())
                .await?;
            snapshot.adopt_participant(stored);
        }

        let touched: Vec<(u64, PrizePatch)> = snapshot
            .prizes
            .iter()
            .filter(|p| p.consumed > 0 || p.completed || p.batches.iter().any(|b| b.consumed > 0))
            .map(|p| (p.id, PrizePatch::cleared(p)))
            .collect();
        for (id, patch) in touched {
            let stored = self.store.update_prize(id, patch).await?;
            snapshot.adopt_prize(stored);
        }

        match snapshot.first_open_prize().map(|p| p.id) {
            Some(first) => {
                let stored = self.store.set_current_prize(first).await?;
                snapshot.adopt_prize(stored);
                snapshot.current_prize = Some(first);
            }
            None => snapshot.current_prize = None,
        }
        info!("draw progress reset");
        Ok(())
    }
}

/// Placeholder for a prize record that vanished from the store mid-session.
/// The commit still runs to completion; the operator sees the warning.
fn missing_prize(id: u64) -> Prize {
    warn!(prize = id, "prize record missing from snapshot during commit");
    debug!(prize = id, "substituting an empty closed prize record");
    Prize {
        id,
        name: String::new(),
        sort: u32::MAX,
        quota: 0,
        consumed: 0,
        completed: true,
        draw_from_everyone: false,
        batching_enabled: false,
        batches: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{self, MemoryStore};

    fn ledger_parts(
        participants: Vec<Participant>,
        prizes: Vec<Prize>,
    ) -> (MemoryStore, mocks::FixedClock) {
        (
            MemoryStore::new(participants, prizes),
            mocks::FixedClock::at(1_000),
        )
    }

    async fn snapshot_of(store: &MemoryStore) -> Snapshot {
        let mut snapshot = Snapshot::load(store).await.unwrap();
        snapshot.current_prize = snapshot.first_open_prize().map(|p| p.id);
        snapshot
    }

    #[tokio::test]
    async fn commit_persists_winners_and_prize_counters() {
        let (store, clock) = ledger_parts(mocks::roster(5), vec![mocks::prize(1, "First", 1, 3)]);
        let mut snapshot = snapshot_of(&store).await;
        let winners = snapshot.participants[..2].to_vec();
        let mut pending = PendingDraw::new(1, winners);

        let ledger = QuotaLedger::new(&store, &clock);
        let outcome = ledger.commit(&mut snapshot, &mut pending).await.unwrap();

        assert_eq!(outcome.prize.consumed, 2);
        assert!(!outcome.prize_completed);
        assert_eq!(outcome.next_prize, None);
        let stored = store.participants();
        assert!(stored[&1].has_won);
        assert_eq!(stored[&1].prize_ids_won, vec![1]);
        assert_eq!(stored[&1].win_timestamps_ms, vec![1_000]);
        assert!(!stored[&3].has_won);
    }

    #[tokio::test]
    async fn completing_a_prize_advances_to_the_next_open_one() {
        let (store, clock) = ledger_parts(
            mocks::roster(6),
            vec![mocks::prize(1, "First", 1, 2), mocks::prize(2, "Second", 2, 1)],
        );
        let mut snapshot = snapshot_of(&store).await;
        let winners = snapshot.participants[..2].to_vec();
        let mut pending = PendingDraw::new(1, winners);

        let ledger = QuotaLedger::new(&store, &clock);
        let outcome = ledger.commit(&mut snapshot, &mut pending).await.unwrap();

        assert!(outcome.prize_completed);
        assert_eq!(outcome.next_prize, Some(2));
        assert!(!outcome.all_finished);
        assert_eq!(snapshot.current_prize, Some(2));
        assert_eq!(store.current(), Some(2));
        assert!(store.prizes()[&1].completed);
    }

    #[tokio::test]
    async fn final_prize_leaves_no_current() {
        let (store, clock) = ledger_parts(mocks::roster(3), vec![mocks::prize(1, "Only", 1, 1)]);
        let mut snapshot = snapshot_of(&store).await;
        let winners = snapshot.participants[..1].to_vec();
        let mut pending = PendingDraw::new(1, winners);

        let ledger = QuotaLedger::new(&store, &clock);
        let outcome = ledger.commit(&mut snapshot, &mut pending).await.unwrap();

        assert!(outcome.prize_completed);
        assert_eq!(outcome.next_prize, None);
        assert!(outcome.all_finished);
        assert_eq!(snapshot.current_prize, None);
    }

    #[tokio::test]
    async fn batched_prize_closes_batches_in_order() {
        let prize = mocks::batched_prize(1, "Batched", 1, &[4, 3]);
        let (store, clock) = ledger_parts(mocks::roster(10), vec![prize]);
        let mut snapshot = snapshot_of(&store).await;
        let ledger = QuotaLedger::new(&store, &clock);

        let round_one = snapshot.participants[..4].to_vec();
        let mut pending = PendingDraw::new(1, round_one);
        let outcome = ledger.commit(&mut snapshot, &mut pending).await.unwrap();
        assert!(!outcome.prize_completed);
        assert_eq!(outcome.prize.batches[0].consumed, 4);
        assert_eq!(outcome.prize.batches[1].consumed, 0);
        assert_eq!(outcome.prize.effective_remaining(), 3);

        let round_two = snapshot.participants[4..7].to_vec();
        let mut pending = PendingDraw::new(1, round_two);
        let outcome = ledger.commit(&mut snapshot, &mut pending).await.unwrap();
        assert!(outcome.prize_completed);
        assert_eq!(outcome.prize.consumed, 7);
        assert_eq!(outcome.prize.batches[1].consumed, 3);
    }

    #[tokio::test]
    async fn retry_after_mid_commit_failure_does_not_double_count() {
        let (store, clock) = ledger_parts(mocks::roster(5), vec![mocks::prize(1, "First", 1, 3)]);
        let mut snapshot = snapshot_of(&store).await;
        let winners = snapshot.participants[..3].to_vec();
        let mut pending = PendingDraw::new(1, winners);
        let ledger = QuotaLedger::new(&store, &clock);

        // Two winner writes succeed, the third write fails.
        store.set_fail_after(2);
        ledger
            .commit(&mut snapshot, &mut pending)
            .await
            .expect_err("third write fails");

        store.clear_failures();
        let outcome = ledger.commit(&mut snapshot, &mut pending).await.unwrap();

        assert_eq!(outcome.prize.consumed, 3);
        assert!(outcome.prize_completed);
        let stored = store.participants();
        for winner in &pending.winners {
            assert_eq!(stored[&winner.id].prize_ids_won, vec![1]);
            assert_eq!(stored[&winner.id].win_timestamps_ms.len(), 1);
        }
    }

    #[tokio::test]
    async fn reset_clears_wins_counters_and_rewinds_current() {
        let (store, clock) = ledger_parts(
            mocks::roster(4),
            vec![mocks::prize(1, "First", 1, 2), mocks::prize(2, "Second", 2, 1)],
        );
        let mut snapshot = snapshot_of(&store).await;
        let ledger = QuotaLedger::new(&store, &clock);

        let winners = snapshot.participants[..2].to_vec();
        let mut pending = PendingDraw::new(1, winners);
        ledger.commit(&mut snapshot, &mut pending).await.unwrap();
        assert_eq!(snapshot.current_prize, Some(2));

        ledger.reset(&mut snapshot).await.unwrap();

        assert!(snapshot.participants.iter().all(|p| !p.has_won));
        assert!(snapshot.prizes.iter().all(|p| p.consumed == 0 && !p.completed));
        assert_eq!(snapshot.current_prize, Some(1));
        assert_eq!(store.current(), Some(1));
    }
}
