use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use uuid::Uuid;

use crate::MAX_NAME_LENGTH;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum ParticipantInvariantError {
    #[error("participant name too long (len={len}, max={max})")]
    NameTooLong { len: usize, max: usize },
    #[error(
        "win history length mismatch (names={names}, ids={ids}, timestamps={timestamps})"
    )]
    WinHistoryMismatch {
        names: usize,
        ids: usize,
        timestamps: usize,
    },
    #[error("has_won={has_won} disagrees with win history length {wins}")]
    WinFlagMismatch { has_won: bool, wins: usize },
}

/// A member of the draw roster.
///
/// The three win-history sequences are parallel: one entry per win event, in
/// chronological commit order. `has_won` is true exactly when the history is
/// non-empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Stable store-assigned id.
    pub id: u64,
    /// Opaque external identifier, assigned separately from `id`.
    pub uuid: Uuid,
    pub name: String,
    pub department: String,
    /// Role or title shown on the card.
    pub identity: String,
    /// Badge code shown on the card.
    pub badge: String,
    pub has_won: bool,
    pub prize_names_won: Vec<String>,
    pub prize_ids_won: Vec<u64>,
    pub win_timestamps_ms: Vec<u64>,
}

impl Participant {
    pub fn validate_invariants(&self) -> Result<(), ParticipantInvariantError> {
        if self.name.len() > MAX_NAME_LENGTH {
            return Err(ParticipantInvariantError::NameTooLong {
                len: self.name.len(),
                max: MAX_NAME_LENGTH,
            });
        }
        let names = self.prize_names_won.len();
        let ids = self.prize_ids_won.len();
        let timestamps = self.win_timestamps_ms.len();
        if names != ids || ids != timestamps {
            return Err(ParticipantInvariantError::WinHistoryMismatch {
                names,
                ids,
                timestamps,
            });
        }
        if self.has_won != (ids > 0) {
            return Err(ParticipantInvariantError::WinFlagMismatch {
                has_won: self.has_won,
                wins: ids,
            });
        }
        Ok(())
    }

    /// Append one win event and set the win flag.
    pub fn record_win(&mut self, prize_name: &str, prize_id: u64, now_ms: u64) {
        self.prize_names_won.push(prize_name.to_string());
        self.prize_ids_won.push(prize_id);
        self.win_timestamps_ms.push(now_ms);
        self.has_won = true;
    }

    /// Clear all win state, keeping the record itself.
    pub fn clear_wins(&mut self) {
        self.has_won = false;
        self.prize_names_won.clear();
        self.prize_ids_won.clear();
        self.win_timestamps_ms.clear();
    }

    pub fn has_won_prize(&self, prize_id: u64) -> bool {
        self.prize_ids_won.contains(&prize_id)
    }
}

/// Partial update for a participant record.
///
/// Only fields the core changed are set; the store adapter translates unset
/// fields into an omitted wire field (server-authoritative merge).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_won: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize_names_won: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize_ids_won: Option<Vec<u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win_timestamps_ms: Option<Vec<u64>>,
}

impl ParticipantPatch {
    pub fn is_empty(&self) -> bool {
        self.has_won.is_none()
            && self.prize_names_won.is_none()
            && self.prize_ids_won.is_none()
            && self.win_timestamps_ms.is_none()
    }

    /// Patch carrying a participant's full win state.
    pub fn win_state(participant: &Participant) -> Self {
        Self {
            has_won: Some(participant.has_won),
            prize_names_won: Some(participant.prize_names_won.clone()),
            prize_ids_won: Some(participant.prize_ids_won.clone()),
            win_timestamps_ms: Some(participant.win_timestamps_ms.clone()),
        }
    }

    /// Patch clearing all win state.
    pub fn cleared() -> Self {
        Self {
            has_won: Some(false),
            prize_names_won: Some(Vec::new()),
            prize_ids_won: Some(Vec::new()),
            win_timestamps_ms: Some(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant() -> Participant {
        Participant {
            id: 1,
            uuid: Uuid::nil(),
            name: "Ada".to_string(),
            department: "Research".to_string(),
            identity: "Engineer".to_string(),
            badge: "A001".to_string(),
            has_won: false,
            prize_names_won: Vec::new(),
            prize_ids_won: Vec::new(),
            win_timestamps_ms: Vec::new(),
        }
    }

    #[test]
    fn record_win_keeps_history_parity() {
        let mut p = participant();
        p.record_win("Grand Prize", 7, 1_000);
        p.record_win("Raffle", 9, 2_000);
        p.validate_invariants().expect("valid invariants");
        assert!(p.has_won);
        assert_eq!(p.prize_ids_won, vec![7, 9]);
        assert_eq!(p.win_timestamps_ms, vec![1_000, 2_000]);
    }

    #[test]
    fn clear_wins_resets_flag_and_history() {
        let mut p = participant();
        p.record_win("Grand Prize", 7, 1_000);
        p.clear_wins();
        p.validate_invariants().expect("valid invariants");
        assert!(!p.has_won);
        assert!(p.prize_ids_won.is_empty());
    }

    #[test]
    fn validate_rejects_history_mismatch() {
        let mut p = participant();
        p.prize_ids_won.push(3);
        p.has_won = true;
        assert!(matches!(
            p.validate_invariants(),
            Err(ParticipantInvariantError::WinHistoryMismatch { .. })
        ));
    }

    #[test]
    fn validate_rejects_stale_win_flag() {
        let mut p = participant();
        p.has_won = true;
        assert!(matches!(
            p.validate_invariants(),
            Err(ParticipantInvariantError::WinFlagMismatch { .. })
        ));
    }

    #[test]
    fn validate_rejects_name_too_long() {
        let mut p = participant();
        p.name = "x".repeat(MAX_NAME_LENGTH + 1);
        assert!(matches!(
            p.validate_invariants(),
            Err(ParticipantInvariantError::NameTooLong { .. })
        ));
    }

    #[test]
    fn empty_patch_serializes_to_empty_object() {
        let patch = ParticipantPatch::default();
        assert!(patch.is_empty());
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
