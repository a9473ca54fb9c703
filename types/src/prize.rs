use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum PrizeInvariantError {
    #[error("consumed exceeds quota (consumed={consumed}, quota={quota})")]
    ConsumedOverQuota { consumed: u32, quota: u32 },
    #[error("batch {batch_id} consumed exceeds its quota (consumed={consumed}, quota={quota})")]
    BatchConsumedOverQuota {
        batch_id: String,
        consumed: u32,
        quota: u32,
    },
}

/// One sub-division of a prize's quota, drawn in a separate round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeBatch {
    pub id: String,
    pub quota: u32,
    pub consumed: u32,
}

impl PrizeBatch {
    pub fn is_full(&self) -> bool {
        self.consumed >= self.quota
    }

    pub fn remaining(&self) -> u32 {
        self.quota.saturating_sub(self.consumed)
    }
}

/// A prize with a winner quota and completion tracking.
///
/// `completed` is the sole authority for "done": an operator may mark a prize
/// completed while `consumed < quota`, and the orchestrator auto-marks it
/// once `consumed` reaches `quota`. When batching is enabled, batches are
/// exhausted in list order; quota drift between the batch sum and `quota` is
/// tolerated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prize {
    pub id: u64,
    pub name: String,
    /// Position in the event's prize sequence; auto-advance walks this order.
    pub sort: u32,
    /// Total winners this prize should produce.
    pub quota: u32,
    /// Winners already committed.
    pub consumed: u32,
    pub completed: bool,
    /// When true, the candidate pool excludes only winners of *this* prize;
    /// when false, it excludes winners of any prize.
    pub draw_from_everyone: bool,
    pub batching_enabled: bool,
    pub batches: Vec<PrizeBatch>,
}

impl Prize {
    pub fn validate_invariants(&self) -> Result<(), PrizeInvariantError> {
        if self.consumed > self.quota {
            return Err(PrizeInvariantError::ConsumedOverQuota {
                consumed: self.consumed,
                quota: self.quota,
            });
        }
        for batch in &self.batches {
            if batch.consumed > batch.quota {
                return Err(PrizeInvariantError::BatchConsumedOverQuota {
                    batch_id: batch.id.clone(),
                    consumed: batch.consumed,
                    quota: batch.quota,
                });
            }
        }
        Ok(())
    }

    /// Eligible for drawing: not manually or automatically finished.
    pub fn is_open(&self) -> bool {
        !self.completed && self.consumed < self.quota
    }

    pub fn remaining(&self) -> u32 {
        self.quota.saturating_sub(self.consumed)
    }

    /// First batch in list order with remaining quota, if batching applies.
    pub fn first_open_batch(&self) -> Option<&PrizeBatch> {
        if !self.batching_enabled {
            return None;
        }
        self.batches.iter().find(|b| !b.is_full())
    }

    pub fn first_open_batch_mut(&mut self) -> Option<&mut PrizeBatch> {
        if !self.batching_enabled {
            return None;
        }
        self.batches.iter_mut().find(|b| !b.is_full())
    }

    /// Remaining count for the next round: the first open batch's remainder
    /// when batching is enabled, otherwise the prize-level remainder.
    pub fn effective_remaining(&self) -> u32 {
        match self.first_open_batch() {
            Some(batch) => batch.remaining(),
            None => self.remaining(),
        }
    }

    /// Drift between the batch quota sum and the prize quota, if any.
    /// Returns `(batch_sum, quota)` when they disagree.
    pub fn batch_drift(&self) -> Option<(u32, u32)> {
        if !self.batching_enabled || self.batches.is_empty() {
            return None;
        }
        let sum: u32 = self.batches.iter().map(|b| b.quota).sum();
        (sum != self.quota).then_some((sum, self.quota))
    }
}

/// Partial update for a prize record. Batch sub-counts travel as the full
/// batch list, matching the store's replace-on-write batch handling.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batches: Option<Vec<PrizeBatch>>,
}

impl PrizePatch {
    pub fn is_empty(&self) -> bool {
        self.consumed.is_none() && self.completed.is_none() && self.batches.is_none()
    }

    /// Patch resetting all draw progress.
    pub fn cleared(prize: &Prize) -> Self {
        let batches = prize
            .batches
            .iter()
            .map(|b| PrizeBatch {
                id: b.id.clone(),
                quota: b.quota,
                consumed: 0,
            })
            .collect();
        Self {
            consumed: Some(0),
            completed: Some(false),
            batches: Some(batches),
        }
    }
}
