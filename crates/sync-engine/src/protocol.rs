// crates/sync-engine/src/protocol.rs
//! Wire format exchanged with the remote store

use duelrank_core::{
    PendingBattles, RatingSet, RefinementQueue, SessionId, StoreSnapshot, Timestamp,
};
use serde::{Deserialize, Serialize};

/// Full store contents sent on every push
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    pub session_id: SessionId,
    pub ratings: RatingSet,
    pub total_battles: u64,
    pub total_battles_last_updated: Option<Timestamp>,
    pub pending_battles: PendingBattles,
    pub refinement_queue: RefinementQueue,
    /// When the push was assembled
    pub last_updated: Timestamp,
}

/// Answer to a push
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub session_id: SessionId,
}

/// Answer to a pull. Every data field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PullResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratings: Option<RatingSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_battles: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_battles_last_updated: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_battles: Option<PendingBattles>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refinement_queue: Option<RefinementQueue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PushRequest {
    pub fn new(session_id: SessionId, snapshot: StoreSnapshot, at: Timestamp) -> Self {
        Self {
            session_id,
            ratings: snapshot.ratings,
            total_battles: snapshot.total_battles,
            total_battles_last_updated: snapshot.total_battles_last_updated,
            pending_battles: snapshot.pending_battles,
            refinement_queue: snapshot.refinement_queue,
            last_updated: at,
        }
    }

    /// The pushed store contents
    pub fn into_snapshot(self) -> StoreSnapshot {
        StoreSnapshot {
            ratings: self.ratings,
            pending_battles: self.pending_battles,
            refinement_queue: self.refinement_queue,
            total_battles: self.total_battles,
            total_battles_last_updated: self.total_battles_last_updated,
        }
    }
}

impl PushResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(reason.into()),
        }
    }
}

impl PullResponse {
    /// A successful answer carrying `snapshot`
    pub fn found(snapshot: StoreSnapshot) -> Self {
        Self {
            success: true,
            ratings: Some(snapshot.ratings),
            total_battles: Some(snapshot.total_battles),
            total_battles_last_updated: snapshot.total_battles_last_updated,
            pending_battles: Some(snapshot.pending_battles),
            refinement_queue: Some(snapshot.refinement_queue),
            error: None,
        }
    }

    /// A successful answer for a session the remote has never seen
    pub fn empty() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(reason.into()),
            ..Self::default()
        }
    }

    /// True when the answer carries no store data at all
    pub fn has_no_data(&self) -> bool {
        self.ratings.is_none()
            && self.total_battles.is_none()
            && self.pending_battles.is_none()
            && self.refinement_queue.is_none()
    }

    /// Remote store contents, `None` when the answer carries no data.
    ///
    /// Missing fields are read as empty.
    pub fn into_snapshot(self) -> Option<StoreSnapshot> {
        if self.has_no_data() {
            return None;
        }
        Some(StoreSnapshot {
            ratings: self.ratings.unwrap_or_default(),
            pending_battles: self.pending_battles.unwrap_or_default(),
            refinement_queue: self.refinement_queue.unwrap_or_default(),
            total_battles: self.total_battles.unwrap_or(0),
            total_battles_last_updated: self.total_battles_last_updated,
        })
    }
}
