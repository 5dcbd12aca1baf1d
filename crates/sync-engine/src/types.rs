// crates/sync-engine/src/types.rs
//! Sync outcomes, notices and status

use crate::breaker::CircuitState;
use crate::merge::MergeStats;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Why a sync attempt did not contact the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The session has not been reconciled with the remote yet
    NotReconciled,
    /// Another push or pull holds the in-flight flag
    InFlight,
    /// Too many recent transport failures
    CircuitOpen,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReconciled => write!(f, "session not reconciled"),
            Self::InFlight => write!(f, "another sync in flight"),
            Self::CircuitOpen => write!(f, "remote paused after failures"),
        }
    }
}

/// Result of `sync_to_cloud`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The remote accepted the snapshot
    Pushed { items: usize },
    Skipped(SkipReason),
}

impl PushOutcome {
    pub fn is_pushed(&self) -> bool {
        matches!(self, Self::Pushed { .. })
    }
}

/// Result of `load_from_cloud`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// Remote data was merged and the session is reconciled
    Merged(MergeStats),
    /// The remote had nothing readable; local state kept, session reconciled
    NoRemoteData,
    /// The session changed while the pull was in flight; the answer was dropped
    Discarded,
    Skipped(SkipReason),
}

impl PullOutcome {
    /// True when the pull reconciled the session it was made for
    pub fn reconciled(&self) -> bool {
        matches!(self, Self::Merged(_) | Self::NoRemoteData)
    }
}

/// Broadcast to consumers for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncNotice {
    /// Recoverable problem; local state is unaffected
    Warning { message: String },
    Pushed { items: usize },
    Merged { changed: usize },
}

/// Counters and timestamps of sync activity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
    pub last_push: Option<DateTime<Utc>>,
    pub last_pull: Option<DateTime<Utc>>,
    pub pushes: u64,
    pub pulls: u64,
    pub failures: u64,
    pub last_error: Option<String>,
    pub circuit: CircuitState,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            last_push: None,
            last_pull: None,
            pushes: 0,
            pulls: 0,
            failures: 0,
            last_error: None,
            circuit: CircuitState::Closed,
        }
    }
}

impl SyncStatus {
    pub(crate) fn record_push(&mut self) {
        self.last_push = Some(Utc::now());
        self.pushes += 1;
        self.last_error = None;
    }

    pub(crate) fn record_pull(&mut self) {
        self.last_pull = Some(Utc::now());
        self.pulls += 1;
        self.last_error = None;
    }

    pub(crate) fn record_failure(&mut self, message: String) {
        self.failures += 1;
        self.last_error = Some(message);
    }
}
