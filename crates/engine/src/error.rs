//! Error types for keepstate-engine
//!
//! Absent sources (missing registry keys, missing state files) are not
//! errors; they are reported through `tracing::warn!` and a `None`/`Ok(())`
//! outcome. Everything here is a genuine fault.

use crate::prereq::{OnMissing, Operation};
use keepstate_core::path::AbsPath;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for keepstate-engine
#[derive(Error, Debug)]
pub enum Error {
    /// Error reading a file
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: AbsPath,
        #[source]
        source: std::io::Error,
    },

    /// Error writing a file
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: AbsPath,
        #[source]
        source: std::io::Error,
    },

    /// Error creating a directory
    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreate {
        path: AbsPath,
        #[source]
        source: std::io::Error,
    },

    /// State file exists but is not a valid state record
    #[error("Invalid state file {path}: {source}")]
    StateParse {
        path: AbsPath,
        #[source]
        source: serde_json::Error,
    },

    /// State record could not be serialized
    #[error("Failed to serialize state for '{name}': {source}")]
    StateSerialize {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// Registry backend failure
    #[error("Registry error at '{path}': {message}")]
    Registry { path: String, message: String },

    /// An item asks for encryption but no protector was configured
    #[error("Item '{name}' has encrypt=true but no encryption identity is configured")]
    MissingProtector { name: String },

    /// Encrypted state value is not a protected text token
    #[error("Item '{name}' is marked encrypted but its stored value is not text")]
    InvalidProtectedValue { name: String },

    /// Decoded value is not valid UTF-8
    #[error("Decoded value for '{name}' is not valid UTF-8: {source}")]
    InvalidUtf8 {
        name: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// Decoded text cannot be turned back into its recorded scalar type
    #[error("Decoded value for '{name}' is not a valid {kind}: {text}")]
    InvalidScalar {
        name: String,
        kind: String,
        text: String,
    },

    /// Manifest file is not valid TOML for the manifest schema
    #[error("Invalid manifest {}: {source}", path.display())]
    ManifestParse {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Invalid item or prerequisite definition
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A prerequisite with a hard policy failed for the running operation
    #[error(
        "Prerequisite '{name}' failed. Cannot proceed with {operation} operation as '{policy}' is set."
    )]
    PrerequisiteFailed {
        name: String,
        operation: Operation,
        policy: OnMissing,
    },

    /// Subprocess could not be launched
    #[error("Process error running '{program}': {message}")]
    Process { program: String, message: String },

    /// Error from the core crate (paths, protect primitive)
    #[error(transparent)]
    Core(#[from] keepstate_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn registry(path: &str, message: impl Into<String>) -> Self {
        Error::Registry {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_prerequisite_failed_message_backup() {
        let err = Error::PrerequisiteFailed {
            name: "Git".to_string(),
            operation: Operation::Backup,
            policy: OnMissing::FailBackup,
        };
        assert_eq!(
            err.to_string(),
            "Prerequisite 'Git' failed. Cannot proceed with Backup operation as 'fail_backup' is set."
        );
    }

    #[test]
    fn test_prerequisite_failed_message_restore() {
        let err = Error::PrerequisiteFailed {
            name: "Terminal".to_string(),
            operation: Operation::Restore,
            policy: OnMissing::FailRestore,
        };
        assert_eq!(
            err.to_string(),
            "Prerequisite 'Terminal' failed. Cannot proceed with Restore operation as 'fail_restore' is set."
        );
    }
}
