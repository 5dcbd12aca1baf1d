//! Error types and recovery strategies for duelrank
//!
//! Errors fall into three severity tiers:
//! - **Recoverable**: the next push or pull will try again (remote unreachable, timeouts)
//! - **Degraded**: sync is held back but local ranking keeps working (not yet reconciled,
//!   a stale pull, a damaged state file that was replaced)
//! - **Fatal**: the process cannot continue without user action
//!
//! Each error maps to a recovery action so callers can decide what to show the user.
//! Invalid reorder indices are not represented here: they are caller contract
//! violations and panic.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Recovery actions that can be taken when an error occurs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Retry the operation immediately
    RetryImmediate,
    /// Wait for the next scheduled push or reconciliation
    RetryWithBackoff,
    /// Keep local state as-is and carry on
    KeepLocalState,
    /// Hold pushes until the session has been reconciled with the remote
    AwaitReconciliation,
    /// Discard the local state file and start fresh
    ResetLocalState,
    /// Restore from the most recent backup
    RestoreBackup,
    /// No automatic recovery - user intervention required
    UserIntervention,
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetryImmediate => write!(f, "Retrying immediately"),
            Self::RetryWithBackoff => write!(f, "Retrying on next sync"),
            Self::KeepLocalState => write!(f, "Keeping local state"),
            Self::AwaitReconciliation => write!(f, "Waiting for reconciliation"),
            Self::ResetLocalState => write!(f, "Resetting local state"),
            Self::RestoreBackup => write!(f, "Restoring from backup"),
            Self::UserIntervention => write!(f, "User intervention required"),
        }
    }
}

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Error can be automatically recovered from
    Recoverable,
    /// Feature degraded but app can continue
    Degraded,
    /// Critical error requiring restart or user action
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable => write!(f, "Recoverable"),
            Self::Degraded => write!(f, "Degraded"),
            Self::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Main error type for duelrank
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Remote Errors =====
    /// The remote store could not be reached
    #[error("Remote unavailable: {message}")]
    RemoteUnavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The remote store did not answer in time
    #[error("Remote timeout after {seconds}s: {operation}")]
    RemoteTimeout { operation: String, seconds: u64 },

    /// The remote store answered but refused the request
    #[error("Remote rejected {operation}: {reason}")]
    RemoteRejected { operation: String, reason: String },

    /// The remote payload could not be understood
    #[error("Malformed remote payload: {details}")]
    MalformedPayload { details: String },

    // ===== Sync Sequencing =====
    /// A push was attempted before the session was reconciled
    #[error("Session {session} is not reconciled yet")]
    NotReconciled { session: String },

    /// A pull finished after the session it was made for had been replaced
    #[error("Stale pull for session {expected} (current: {current})")]
    StaleSession { expected: String, current: String },

    // ===== Local State Errors =====
    /// The persisted state file could not be written
    #[error("Failed to persist state to {path}: {message}")]
    PersistenceFailed { path: PathBuf, message: String },

    /// The persisted state file is damaged
    #[error("State file corrupted at {path}: {reason}")]
    StateCorrupted { path: PathBuf, reason: String },

    /// General I/O error
    #[error("I/O error: {message}")]
    IoError {
        message: String,
        #[source]
        source: io::Error,
    },

    // ===== Configuration Errors =====
    /// Invalid configuration
    #[error("Invalid configuration: {setting} = '{value}' ({reason})")]
    InvalidConfiguration {
        setting: String,
        value: String,
        reason: String,
    },

    /// Configuration file corrupted
    #[error("Configuration corrupted: {path}")]
    ConfigurationCorrupted { path: PathBuf },

    // ===== Generic Errors =====
    /// Generic internal error
    #[error("Internal error: {message}")]
    InternalError { message: String },

    /// Invalid argument provided
    #[error("Invalid argument: {argument} - {reason}")]
    InvalidArgument { argument: String, reason: String },
}

impl AppError {
    /// Returns the severity level of this error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::RemoteUnavailable { .. }
            | Self::RemoteTimeout { .. }
            | Self::PersistenceFailed { .. } => ErrorSeverity::Recoverable,

            Self::RemoteRejected { .. }
            | Self::MalformedPayload { .. }
            | Self::NotReconciled { .. }
            | Self::StaleSession { .. }
            | Self::StateCorrupted { .. }
            | Self::InvalidConfiguration { .. } => ErrorSeverity::Degraded,

            Self::ConfigurationCorrupted { .. } | Self::InternalError { .. } => {
                ErrorSeverity::Fatal
            }

            // Context-dependent - default to degraded
            _ => ErrorSeverity::Degraded,
        }
    }

    /// Returns the recommended recovery action for this error
    pub fn recovery_action(&self) -> RecoveryAction {
        match self {
            Self::RemoteTimeout { .. } => RecoveryAction::RetryImmediate,

            Self::RemoteUnavailable { .. }
            | Self::RemoteRejected { .. }
            | Self::PersistenceFailed { .. } => RecoveryAction::RetryWithBackoff,

            Self::MalformedPayload { .. } | Self::StaleSession { .. } => {
                RecoveryAction::KeepLocalState
            }

            Self::NotReconciled { .. } => RecoveryAction::AwaitReconciliation,

            Self::StateCorrupted { .. } => RecoveryAction::ResetLocalState,

            Self::ConfigurationCorrupted { .. } => RecoveryAction::RestoreBackup,

            // Default to user intervention for safety
            _ => RecoveryAction::UserIntervention,
        }
    }

    /// Returns a user-friendly error message suitable for display in the UI
    pub fn user_message(&self) -> String {
        match self {
            Self::RemoteUnavailable { .. } | Self::RemoteTimeout { .. } => {
                "Could not reach the sync server. Your rankings are saved on this device."
                    .to_string()
            }
            Self::RemoteRejected { .. } => {
                "The sync server refused the update. It will be retried with your next change."
                    .to_string()
            }
            Self::MalformedPayload { .. } => {
                "The sync server sent data we could not read. Keeping your local rankings."
                    .to_string()
            }
            Self::NotReconciled { .. } => {
                "Still downloading your rankings from the server.".to_string()
            }
            Self::StaleSession { .. } => {
                "Ignored an outdated download from a previous account.".to_string()
            }
            Self::PersistenceFailed { .. } | Self::IoError { .. } => {
                "Could not save rankings to disk. Please check free space and permissions."
                    .to_string()
            }
            Self::StateCorrupted { .. } => {
                "Saved rankings were damaged and have been reset. A backup was kept.".to_string()
            }
            Self::InvalidConfiguration { setting, .. } => {
                format!("Invalid setting: {}. Please check your configuration.", setting)
            }
            Self::ConfigurationCorrupted { .. } => {
                "App settings are corrupted. Restoring from backup...".to_string()
            }
            Self::InternalError { .. } => {
                "An unexpected error occurred. Please try again.".to_string()
            }
            Self::InvalidArgument { .. } => "Invalid input provided.".to_string(),
        }
    }

    /// Returns true if this error should be logged at ERROR level
    pub fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Fatal
    }

    /// Returns true if the next sync attempt may succeed on its own
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.recovery_action(),
            RecoveryAction::RetryImmediate | RecoveryAction::RetryWithBackoff
        )
    }

    /// Helper to create a remote error from any error type
    pub fn remote<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::RemoteUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Convenience type alias for Results using AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        Self::IoError {
            message: err.to_string(),
            source: err,
        }
    }
}
