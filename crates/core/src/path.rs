//! Type-safe path types
//!
//! - [`AbsPath`]: absolute filesystem paths (state-files roots, backup dirs)
//! - [`RelPath`]: relative paths that never leave their base (dynamic state paths)
//!
//! # Examples
//!
//! ```
//! use keepstate_core::path::{AbsPath, RelPath};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let root = AbsPath::new("/backups/host-a".into())?;
//! let state = RelPath::new("registry/explorer.json".into())?;
//!
//! let file = root.join(&state);
//! assert_eq!(file.as_path().to_str().unwrap(), "/backups/host-a/registry/explorer.json");
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// An absolute path on the filesystem
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AbsPath(PathBuf);

impl AbsPath {
    /// Create a new `AbsPath` from a `PathBuf`
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute.
    pub fn new(path: PathBuf) -> Result<Self> {
        if path.is_absolute() {
            Ok(AbsPath(path))
        } else {
            Err(Error::PathNotAbsolute { path })
        }
    }

    /// Create an `AbsPath`, resolving relative input against the current directory
    pub fn resolve(path: &Path) -> Result<Self> {
        if path.is_absolute() {
            return Ok(AbsPath(path.to_path_buf()));
        }
        let cwd = std::env::current_dir()?;
        Ok(AbsPath(cwd.join(path)))
    }

    /// Get the underlying `Path`
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Join with a relative path to create a new absolute path
    pub fn join(&self, rel: &RelPath) -> Self {
        AbsPath(self.0.join(rel.as_path()))
    }

    /// Get the parent directory
    ///
    /// Returns `None` if this is the root directory.
    pub fn parent(&self) -> Option<Self> {
        self.0.parent().map(|p| AbsPath(p.to_path_buf()))
    }
}

/// A relative path that stays under its base directory
///
/// Rejects absolute paths and any `..` component, so joining it onto a
/// state-files root can never address a file outside that root.
///
/// ```
/// use keepstate_core::path::RelPath;
///
/// assert!(RelPath::new("apps/terminal.json".into()).is_ok());
/// assert!(RelPath::new("../outside.json".into()).is_err());
/// assert!(RelPath::new("/etc/passwd".into()).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PathBuf", into = "PathBuf")]
pub struct RelPath(PathBuf);

impl RelPath {
    /// Create a new `RelPath` from a `PathBuf`
    ///
    /// # Errors
    ///
    /// Returns an error if the path is absolute, contains `..`, or has no
    /// normal component (`""`, `.`, `./.`).
    pub fn new(path: PathBuf) -> Result<Self> {
        if !path.is_relative() || path.has_root() {
            return Err(Error::PathNotRelative { path });
        }
        if path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(Error::PathEscapesBase { path });
        }
        if !path.components().any(|c| matches!(c, Component::Normal(_))) {
            return Err(Error::PathEmpty { path });
        }
        Ok(RelPath(path))
    }

    /// Get the underlying `Path`
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl TryFrom<PathBuf> for RelPath {
    type Error = Error;

    fn try_from(path: PathBuf) -> Result<Self> {
        Self::new(path)
    }
}

impl From<RelPath> for PathBuf {
    fn from(rel: RelPath) -> Self {
        rel.0
    }
}

impl std::fmt::Display for AbsPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl std::fmt::Display for RelPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}
