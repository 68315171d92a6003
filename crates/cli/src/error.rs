//! Error types for CLI commands
//!
//! This module defines structured error types using thiserror, so callers
//! can tell a blocked operation from a partially failed one.

use thiserror::Error;

/// Errors that can occur during command execution
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CommandError {
    /// A prerequisite with a hard policy failed
    #[error(transparent)]
    Blocked(keepstate_engine::Error),

    /// Some items could not be captured or replayed
    #[error("{operation} failed: {failed} out of {total} items")]
    ItemsFailed {
        /// Backup or Restore
        operation: keepstate_engine::Operation,
        /// Number of items that failed
        failed: usize,
        /// Total number of items
        total: usize,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Encryption setup error
    #[error("Encryption error: {0}")]
    EncryptionError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Engine error outside of item processing
    #[error(transparent)]
    Engine(keepstate_engine::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<keepstate_core::Error> for CommandError {
    fn from(err: keepstate_core::Error) -> Self {
        Self::Other(err.into())
    }
}

impl From<keepstate_engine::Error> for CommandError {
    fn from(err: keepstate_engine::Error) -> Self {
        match err {
            keepstate_engine::Error::PrerequisiteFailed { .. } => Self::Blocked(err),
            other => Self::Engine(other),
        }
    }
}

/// Result type alias for command operations
pub type Result<T> = std::result::Result<T, CommandError>;

impl CommandError {
    /// Create a `ConfigError` from any error type
    pub fn config<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self::ConfigError(Box::new(err))
    }

    /// Create an `EncryptionError` from any error type
    pub fn encryption<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self::EncryptionError(Box::new(err))
    }
}
