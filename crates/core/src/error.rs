//! Base error types for keepstate
//!
//! This module provides the foundation error types that all crates can use.

use std::path::PathBuf;
use thiserror::Error;

/// Base error type for shared functionality
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Path is not absolute
    #[error("Path must be absolute: {}", path.display())]
    PathNotAbsolute { path: PathBuf },

    /// Path is not relative
    #[error("Path must be relative: {}", path.display())]
    PathNotRelative { path: PathBuf },

    /// Relative path names no file or directory below its base
    #[error("Path must name an entry below its base directory: '{}'", path.display())]
    PathEmpty { path: PathBuf },

    /// Relative path climbs out of its base directory
    #[error("Path must stay under its base directory: {}", path.display())]
    PathEscapesBase { path: PathBuf },

    /// Encoding primitive failure (protect or unprotect)
    #[error("Protect error: {0}")]
    Protect(String),

    /// Generic error message
    #[error("{0}")]
    Message(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
