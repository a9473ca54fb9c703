//! Wire representation of the backend's records.
//!
//! The backend speaks snake_case JSON with its own field vocabulary
//! (`count`/`is_used_count` for quotas, `is_all` for the pool policy,
//! `is_win`/`prize_time` for win history). This module owns the translation
//! in both directions; nothing outside it touches wire names.

use serde::{Deserialize, Serialize};
use stagedraw_types::{
    Participant, ParticipantPatch, Prize, PrizeBatch, PrizePatch,
};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WirePerson {
    pub id: u64,
    #[serde(default)]
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub work_no: String,
    #[serde(default)]
    pub is_win: bool,
    #[serde(default)]
    pub prize_name: Vec<String>,
    #[serde(default)]
    pub prize_id: Vec<u64>,
    #[serde(default)]
    pub prize_time: Vec<u64>,
}

impl WirePerson {
    pub fn into_domain(self) -> Participant {
        Participant {
            id: self.id,
            uuid: Uuid::parse_str(&self.uid).unwrap_or(Uuid::nil()),
            name: self.name,
            department: self.department,
            identity: self.identity,
            badge: self.work_no,
            has_won: self.is_win,
            prize_names_won: self.prize_name,
            prize_ids_won: self.prize_id,
            win_timestamps_ms: self.prize_time,
        }
    }
}

impl From<&Participant> for WirePerson {
    fn from(p: &Participant) -> Self {
        Self {
            id: p.id,
            uid: p.uuid.to_string(),
            name: p.name.clone(),
            department: p.department.clone(),
            identity: p.identity.clone(),
            work_no: p.badge.clone(),
            is_win: p.has_won,
            prize_name: p.prize_names_won.clone(),
            prize_id: p.prize_ids_won.clone(),
            prize_time: p.win_timestamps_ms.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WireBatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub count: u32,
    #[serde(default)]
    pub is_used_count: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WirePrize {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub sort: u32,
    pub count: u32,
    #[serde(default)]
    pub is_used_count: u32,
    #[serde(default)]
    pub is_used: bool,
    #[serde(default)]
    pub is_all: bool,
    #[serde(default)]
    pub separate_count_enable: bool,
    #[serde(default)]
    pub separate_count_list: Vec<WireBatch>,
}

impl WirePrize {
    pub fn into_domain(self) -> Prize {
        let batches = self
            .separate_count_list
            .into_iter()
            .enumerate()
            .map(|(i, b)| PrizeBatch {
                id: b.id.unwrap_or_else(|| format!("batch-{}", i + 1)),
                quota: b.count,
                consumed: b.is_used_count,
            })
            .collect();
        Prize {
            id: self.id,
            name: self.name,
            sort: self.sort,
            quota: self.count,
            consumed: self.is_used_count,
            completed: self.is_used,
            draw_from_everyone: self.is_all,
            batching_enabled: self.separate_count_enable,
            batches,
        }
    }
}

impl From<&Prize> for WirePrize {
    fn from(p: &Prize) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            sort: p.sort,
            count: p.quota,
            is_used_count: p.consumed,
            is_used: p.completed,
            is_all: p.draw_from_everyone,
            separate_count_enable: p.batching_enabled,
            separate_count_list: p
                .batches
                .iter()
                .map(|b| WireBatch {
                    id: Some(b.id.clone()),
                    count: b.quota,
                    is_used_count: b.consumed,
                })
                .collect(),
        }
    }
}

/// Partial prize update. Unset fields are omitted entirely so the backend
/// leaves them untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WirePrizePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_used_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_used: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separate_count_list: Option<Vec<WireBatch>>,
}

impl From<PrizePatch> for WirePrizePatch {
    fn from(patch: PrizePatch) -> Self {
        Self {
            is_used_count: patch.consumed,
            is_used: patch.completed,
            separate_count_list: patch.batches.map(|batches| {
                batches
                    .into_iter()
                    .map(|b| WireBatch {
                        id: Some(b.id),
                        count: b.quota,
                        is_used_count: b.consumed,
                    })
                    .collect()
            }),
        }
    }
}

/// Partial participant update, same omission rule as [`WirePrizePatch`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WirePersonPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_win: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize_name: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize_id: Option<Vec<u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize_time: Option<Vec<u64>>,
}

impl From<ParticipantPatch> for WirePersonPatch {
    fn from(patch: ParticipantPatch) -> Self {
        Self {
            is_win: patch.has_won,
            prize_name: patch.prize_names_won,
            prize_id: patch.prize_ids_won,
            prize_time: patch.win_timestamps_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prize_round_trips_through_wire_names() {
        let json = serde_json::json!({
            "id": 3,
            "name": "Grand Prize",
            "sort": 1,
            "count": 7,
            "is_used_count": 4,
            "is_all": true,
            "separate_count_enable": true,
            "separate_count_list": [
                { "count": 4, "is_used_count": 4 },
                { "count": 3, "is_used_count": 0 }
            ]
        });
        let wire: WirePrize = serde_json::from_value(json).unwrap();
        let prize = wire.into_domain();

        assert_eq!(prize.quota, 7);
        assert_eq!(prize.consumed, 4);
        assert!(prize.draw_from_everyone);
        assert!(!prize.completed);
        assert_eq!(prize.batches[0].id, "batch-1");
        assert_eq!(prize.effective_remaining(), 3);

        let back = WirePrize::from(&prize);
        assert_eq!(back.count, 7);
        assert_eq!(back.separate_count_list[1].count, 3);
    }

    #[test]
    fn person_with_unknown_uid_still_loads() {
        let json = serde_json::json!({
            "id": 9,
            "uid": "not-a-uuid",
            "name": "Ada",
            "work_no": "A001",
            "is_win": true,
            "prize_name": ["Grand Prize"],
            "prize_id": [3],
            "prize_time": [1700000000000u64]
        });
        let wire: WirePerson = serde_json::from_value(json).unwrap();
        let person = wire.into_domain();
        assert_eq!(person.uuid, Uuid::nil());
        assert_eq!(person.badge, "A001");
        assert!(person.has_won_prize(3));
    }

    #[test]
    fn empty_patch_serializes_to_empty_object() {
        let patch = WirePrizePatch::from(PrizePatch::default());
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({}));

        let patch = WirePersonPatch::from(ParticipantPatch::cleared());
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "is_win": false,
                "prize_name": [],
                "prize_id": [],
                "prize_time": []
            })
        );
    }
}
