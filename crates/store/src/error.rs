// crates/store/src/error.rs
//! Error types for the rating store

use duelrank_core::AppError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the store and its persistence layer.
///
/// Mutations never return these for persistence problems; those are logged and the
/// in-memory state stays authoritative. They surface from the persistence trait
/// itself and from the engine-facing hooks.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The state record could not be written
    #[error("Failed to persist state to {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The state record exists but cannot be read back
    #[error("State file {path} is corrupted: {reason}")]
    Corrupted { path: PathBuf, reason: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A merge or reconciliation was requested for a session that is no longer current
    #[error("Session {expected} is stale, store now holds {current}")]
    StaleSession { expected: String, current: String },

    /// A battle needs two different items
    #[error("Item {0} cannot battle itself")]
    SelfBattle(String),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Persist { path, source } => AppError::PersistenceFailed {
                path,
                message: source.to_string(),
            },
            StoreError::Corrupted { path, reason } => AppError::StateCorrupted { path, reason },
            StoreError::Serialization(e) => AppError::InternalError {
                message: e.to_string(),
            },
            StoreError::StaleSession { expected, current } => {
                AppError::StaleSession { expected, current }
            }
            StoreError::SelfBattle(item) => AppError::InvalidArgument {
                argument: "loser".to_string(),
                reason: format!("{} cannot battle itself", item),
            },
            StoreError::Io(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duelrank_core::RecoveryAction;

    #[test]
    fn test_error_display() {
        let err = StoreError::SelfBattle("pikachu".to_string());
        assert!(err.to_string().contains("pikachu"));
    }

    #[test]
    fn test_corrupted_maps_to_reset() {
        let err: AppError = StoreError::Corrupted {
            path: PathBuf::from("state.json"),
            reason: "EOF while parsing".to_string(),
        }
        .into();
        assert_eq!(err.recovery_action(), RecoveryAction::ResetLocalState);
    }

    #[test]
    fn test_stale_session_keeps_local_state() {
        let err: AppError = StoreError::StaleSession {
            expected: "a".to_string(),
            current: "b".to_string(),
        }
        .into();
        assert_eq!(err.recovery_action(), RecoveryAction::KeepLocalState);
    }
}
