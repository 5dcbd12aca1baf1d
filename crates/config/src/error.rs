//! Failures while locating, loading or saving `config.toml`

use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The atomic rename onto the config path failed
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} is not valid TOML: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("config could not be encoded as TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Semicolon-joined list of the fields that failed validation
    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("cannot create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No platform config directory and no `--config` given
    #[error("no config directory: {reason}")]
    NoConfigDir { reason: String },

    /// Copying the previous file to `config.toml.backup` failed
    #[error("cannot back up previous config: {source}")]
    Backup { source: std::io::Error },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One rejected field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path, e.g. `remote.endpoint`
    pub field: String,
    pub message: String,
    pub value: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(
        field: impl Into<String>,
        message: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: Some(value.to_string()),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Field '{}': {}", self.field, self.message)?;
        if let Some(ref value) = self.value {
            write!(f, " (got: {})", value)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Joins validation errors into one line for logs and error messages
pub(crate) fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("remote.endpoint", "must not be empty");
        assert_eq!(err.to_string(), "Field 'remote.endpoint': must not be empty");
    }

    #[test]
    fn test_validation_error_with_value() {
        let err = ValidationError::with_value("reorder.sigma_shrink", "must be in (0, 1]", 1.5);
        assert_eq!(
            err.to_string(),
            "Field 'reorder.sigma_shrink': must be in (0, 1] (got: 1.5)"
        );
    }

    #[test]
    fn test_config_error_names_the_file() {
        let err = ConfigError::Read {
            path: PathBuf::from("/etc/duelrank/config.toml"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().starts_with("cannot read /etc/duelrank/config.toml: "));

        let err = ConfigError::Invalid(join_errors(&[ValidationError::new("a", "bad")]));
        assert_eq!(err.to_string(), "invalid config: Field 'a': bad");
    }

    #[test]
    fn test_join_errors() {
        let joined = join_errors(&[
            ValidationError::new("a", "bad"),
            ValidationError::new("b", "worse"),
        ]);
        assert_eq!(joined, "Field 'a': bad; Field 'b': worse");
    }
}
