//! The persisted local record and session metadata

use duelrank_core::{RefinementQueue, SessionId, StoreSnapshot, Timestamp};
use serde::{Deserialize, Serialize};

/// Current format of the state file
pub const STATE_VERSION: u32 = 1;

/// Everything the store keeps on disk.
///
/// The in-flight sync flag is deliberately absent: it lives in engine memory only,
/// so a restart never starts with a sync "in progress".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default = "default_version")]
    pub version: u32,
    pub session_id: SessionId,
    /// Signed-in identity marker, absent for anonymous use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(default)]
    pub reconciled: bool,
    /// Refinement queue the remote was last seen holding, after a pull or an
    /// accepted push. Queue merges are taken relative to it.
    #[serde(default, skip_serializing_if = "RefinementQueue::is_empty")]
    pub remote_queue: RefinementQueue,
    #[serde(flatten)]
    pub data: StoreSnapshot,
}

fn default_version() -> u32 {
    STATE_VERSION
}

impl PersistedState {
    /// A fresh, unreconciled anonymous session
    pub fn new(session_id: SessionId) -> Self {
        Self {
            version: STATE_VERSION,
            session_id,
            identity: None,
            reconciled: false,
            remote_queue: RefinementQueue::new(),
            data: StoreSnapshot::new(),
        }
    }

    /// Drops all ratings, queues and counters and requires a fresh reconciliation
    pub fn discard_data(&mut self) {
        self.data = StoreSnapshot::new();
        self.remote_queue = RefinementQueue::new();
        self.reconciled = false;
    }

    pub fn session(&self) -> Session {
        Session {
            session_id: self.session_id,
            identity: self.identity.clone(),
            reconciled: self.reconciled,
            total_battles: self.data.total_battles,
            total_battles_last_updated: self.data.total_battles_last_updated,
        }
    }
}

/// Read-only view of the session metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: SessionId,
    pub identity: Option<String>,
    pub reconciled: bool,
    pub total_battles: u64,
    pub total_battles_last_updated: Option<Timestamp>,
}
