//! Error types for depot-refresh
//!
//! Hard failures that propagate to the immediate caller. Recoverable
//! conditions inside a refresh are reported as soft errors on
//! [`MetadataEventResponse`](crate::domain::MetadataEventResponse) instead.

use crate::domain::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for depot-refresh operations
pub type DepotResult<T> = Result<T, DepotError>;

/// All hard failures raised by the refresh engine and its collaborators
#[derive(Error, Debug)]
pub enum DepotError {
    // Lookup errors
    #[error("can't find project for {group_id}-{artifact_id}")]
    ProjectNotFound {
        group_id: String,
        artifact_id: String,
    },

    #[error("Invalid version {version}: {reason}")]
    InvalidVersion { version: String, reason: String },

    // Upstream repository errors
    #[error("Repository error for {coordinates}: {reason}")]
    Repository { coordinates: String, reason: String },

    // Persistence errors
    #[error("Store error: {0}")]
    Store(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Invalid settings: {0}")]
    SettingsInvalid(String),

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DepotError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a project-not-found error
    pub fn project_not_found(group_id: &str, artifact_id: &str) -> Self {
        Self::ProjectNotFound {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
        }
    }

    /// Create an upstream repository error
    pub fn repository(group_id: &str, artifact_id: &str, reason: impl Into<String>) -> Self {
        Self::Repository {
            coordinates: format!("{}:{}", group_id, artifact_id),
            reason: reason.into(),
        }
    }

    /// Attribute a settings error to the file it was read from
    pub fn in_file(self, path: &Path) -> Self {
        match self {
            Self::SettingsInvalid(reason) => Self::ConfigInvalid {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        }
    }

    /// Soft-error category used when this failure is folded into a response
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProjectNotFound { .. } => ErrorKind::NotFound,
            Self::Repository { .. } => ErrorKind::Repository,
            Self::InvalidVersion { .. } => ErrorKind::Validation,
            _ => ErrorKind::Unexpected,
        }
    }

    /// Check if a retry of the same call could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Repository { .. } | Self::Store(_) | Self::Io { .. })
    }
}
