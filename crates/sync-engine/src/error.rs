// crates/sync-engine/src/error.rs
//! Error types for sync operations

use crate::transport::TransportError;
use duelrank_core::AppError;
use duelrank_store::StoreError;
use thiserror::Error;

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during synchronization
#[derive(Debug, Error)]
pub enum SyncError {
    /// The request never produced a usable answer
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The remote answered with `success: false`
    #[error("Remote rejected {operation}: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },

    /// Local store refused the result
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl SyncError {
    pub(crate) fn rejected(operation: &'static str, reason: Option<String>) -> Self {
        Self::Rejected {
            operation,
            reason: reason.unwrap_or_else(|| "no reason given".to_string()),
        }
    }
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Transport(TransportError::Timeout { operation, seconds }) => {
                AppError::RemoteTimeout {
                    operation: operation.to_string(),
                    seconds,
                }
            }
            SyncError::Transport(TransportError::Malformed(details)) => {
                AppError::MalformedPayload { details }
            }
            SyncError::Transport(e) => AppError::remote("sync request failed", e),
            SyncError::Rejected { operation, reason } => AppError::RemoteRejected {
                operation: operation.to_string(),
                reason,
            },
            SyncError::Store(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duelrank_core::{ErrorSeverity, RecoveryAction};

    #[test]
    fn test_error_display() {
        let err = SyncError::rejected("push", Some("quota exceeded".to_string()));
        assert!(err.to_string().contains("quota exceeded"));

        let err = SyncError::rejected("pull", None);
        assert!(err.to_string().contains("no reason given"));
    }

    #[test]
    fn test_transport_failure_is_recoverable() {
        let err: AppError =
            SyncError::from(TransportError::Unavailable("connection refused".to_string())).into();
        assert_eq!(err.severity(), ErrorSeverity::Recoverable);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_timeout_maps_to_remote_timeout() {
        let err: AppError = SyncError::from(TransportError::Timeout {
            operation: "push",
            seconds: 10,
        })
        .into();
        assert!(matches!(err, AppError::RemoteTimeout { seconds: 10, .. }));
    }

    #[test]
    fn test_stale_session_keeps_local_state() {
        let err: AppError = SyncError::from(StoreError::StaleSession {
            expected: "a".to_string(),
            current: "b".to_string(),
        })
        .into();
        assert_ne!(err.recovery_action(), RecoveryAction::ResetLocalState);
    }
}
