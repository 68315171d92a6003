//! JSON-file registry hive
//!
//! Stores a hive as `{ "<key path>": { "<value name>": <scalar>, ... } }`.
//! Used on hosts without a native registry and for reproducible fixtures.

use super::{MemoryRegistry, RegistryAccessor, RegistryValue};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Registry hive backed by a JSON file, saved after every write
#[derive(Debug)]
pub struct FileRegistry {
    path: PathBuf,
    inner: MemoryRegistry,
}

impl FileRegistry {
    /// Open a hive file; a missing file starts an empty hive
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let inner = if path.exists() {
            let content = fs::read(&path)?;
            let keys: IndexMap<String, IndexMap<String, RegistryValue>> =
                serde_json::from_slice(&content).map_err(|e| {
                    Error::registry(&path.display().to_string(), format!("invalid hive: {e}"))
                })?;
            MemoryRegistry::from_keys(keys)
        } else {
            tracing::debug!(path = %path.display(), "Hive file not found, starting empty");
            MemoryRegistry::new()
        };

        Ok(Self { path, inner })
    }

    /// Location of the hive file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(&self.inner.to_keys()).map_err(|e| {
            Error::registry(&self.path.display().to_string(), e.to_string())
        })?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl RegistryAccessor for FileRegistry {
    fn key_exists(&self, path: &str) -> Result<bool> {
        self.inner.key_exists(path)
    }

    fn get_value(&self, path: &str, name: &str) -> Result<Option<RegistryValue>> {
        self.inner.get_value(path, name)
    }

    fn set_value(&self, path: &str, name: &str, value: &RegistryValue) -> Result<()> {
        self.inner.set_value(path, name, value)?;
        self.save()
    }

    fn create_key(&self, path: &str) -> Result<()> {
        if self.inner.key_exists(path)? {
            return Ok(());
        }
        self.inner.create_key(path)?;
        self.save()
    }

    fn values(&self, path: &str) -> Result<IndexMap<String, RegistryValue>> {
        self.inner.values(path)
    }
}
