//! Registry access boundary
//!
//! The engines never touch a live registry directly; they go through
//! [`RegistryAccessor`]. Backends:
//!
//! - [`MemoryRegistry`]: in-process hive, used by tests and as the base of
//!   the file backend
//! - [`FileRegistry`]: a JSON file holding a hive, persisted on every write
//! - [`DryRunRegistry`]: reads through to another backend, records writes

mod dry_run;
mod file;
mod memory;

pub use dry_run::{DryRunRegistry, RegistryWrite};
pub use file::FileRegistry;
pub use memory::MemoryRegistry;

use crate::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar registry value
///
/// Serialized untagged, so a state file holds plain JSON scalars:
/// `"OriginalData"`, `12345`, `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegistryValue {
    /// Boolean value
    Boolean(bool),
    /// Integer value (DWORD/QWORD)
    Integer(i64),
    /// String value
    String(String),
}

impl RegistryValue {
    /// Scalar type of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Boolean(_) => ValueKind::Boolean,
            Self::Integer(_) => ValueKind::Integer,
            Self::String(_) => ValueKind::String,
        }
    }

    /// String contents, if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for RegistryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for RegistryValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for RegistryValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for RegistryValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<bool> for RegistryValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

/// Scalar type tag, recorded next to encrypted values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    /// String scalar
    String,
    /// Integer scalar
    Integer,
    /// Boolean scalar
    Boolean,
}

impl ValueKind {
    /// Rebuild a value of this kind from its text form
    ///
    /// Returns `None` if the text does not parse as this kind.
    pub fn parse(self, text: &str) -> Option<RegistryValue> {
        match self {
            Self::String => Some(RegistryValue::String(text.to_string())),
            Self::Integer => text.trim().parse().ok().map(RegistryValue::Integer),
            Self::Boolean => match text.trim().to_ascii_lowercase().as_str() {
                "true" => Some(RegistryValue::Boolean(true)),
                "false" => Some(RegistryValue::Boolean(false)),
                _ => None,
            },
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// Access to registry keys and values
///
/// Key paths are fully qualified (`HKCU:\Software\Vendor\App`). Key paths
/// and value names both match case-insensitively; overwriting a value keeps
/// the name it was first stored under. Writes take `&self`; backends use
/// interior mutability since all access is sequential.
pub trait RegistryAccessor {
    /// Whether the key at `path` exists
    fn key_exists(&self, path: &str) -> Result<bool>;

    /// Read a named value; `Ok(None)` if the key or value is absent
    fn get_value(&self, path: &str, name: &str) -> Result<Option<RegistryValue>>;

    /// Write a named value, creating the key path if needed
    fn set_value(&self, path: &str, name: &str, value: &RegistryValue) -> Result<()>;

    /// Create the key path if it does not exist
    fn create_key(&self, path: &str) -> Result<()>;

    /// Every value directly under the key, in enumeration order
    ///
    /// Subkeys are not included. An absent key yields an empty map.
    fn values(&self, path: &str) -> Result<IndexMap<String, RegistryValue>>;
}

/// Canonical form of a key path for lookups
///
/// Registry paths are case-insensitive and tolerate `/` separators and a
/// trailing separator.
pub(crate) fn normalize_key(path: &str) -> String {
    path.trim()
        .replace('/', "\\")
        .trim_end_matches('\\')
        .to_ascii_lowercase()
}
