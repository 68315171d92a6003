//! State Store
//!
//! Reads and writes JSON records at relative paths under a state-files root.

use crate::error::{Error, Result};
use crate::system::System;
use keepstate_core::path::{AbsPath, RelPath};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// JSON record store rooted at one state-files directory
pub struct StateStore<'a> {
    root: AbsPath,
    system: &'a dyn System,
}

impl<'a> StateStore<'a> {
    /// Create a store for `root`, performing IO through `system`
    pub fn new(root: AbsPath, system: &'a dyn System) -> Self {
        Self { root, system }
    }

    /// The state-files root
    pub fn root(&self) -> &AbsPath {
        &self.root
    }

    /// Absolute location of a state file
    pub fn path_for(&self, rel: &RelPath) -> AbsPath {
        self.root.join(rel)
    }

    /// Read and parse the record at `rel`
    ///
    /// Returns `Ok(None)` when no file exists at that path.
    pub fn read<T: DeserializeOwned>(&self, rel: &RelPath) -> Result<Option<T>> {
        let path = self.path_for(rel);
        if !self.system.exists(&path) {
            return Ok(None);
        }

        let bytes = self.system.read_file(&path)?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| Error::StateParse { path, source })
    }

    /// Serialize `record` as pretty JSON to `rel`, replacing any existing file
    pub fn write<T: Serialize>(&self, rel: &RelPath, name: &str, record: &T) -> Result<AbsPath> {
        let path = self.path_for(rel);
        let mut json =
            serde_json::to_vec_pretty(record).map_err(|source| Error::StateSerialize {
                name: name.to_string(),
                source,
            })?;
        json.push(b'\n');

        self.system.write_file(&path, &json)?;
        tracing::debug!(path = %path, bytes = json.len(), "Wrote state file");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::system::RealSystem;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        name: String,
        count: i64,
    }

    fn store(temp: &TempDir) -> StateStore<'static> {
        StateStore::new(AbsPath::new(temp.path().to_path_buf()).unwrap(), &RealSystem)
    }

    fn rel(path: &str) -> RelPath {
        RelPath::new(path.into()).unwrap()
    }

    #[test]
    fn test_read_missing_returns_none() {
        let temp = TempDir::new().unwrap();
        let record: Option<Record> = store(&temp).read(&rel("absent.json")).unwrap();
        assert!(record.is_none());
    }

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let record = Record {
            name: "x".to_string(),
            count: 3,
        };

        let written = store.write(&rel("deep/dir/x.json"), "x", &record).unwrap();
        assert!(written.as_path().starts_with(temp.path()));

        let read: Record = store.read(&rel("deep/dir/x.json")).unwrap().unwrap();
        assert_eq!(read, record);
    }

    #[test]
    fn test_read_corrupt_is_parse_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("bad.json"), b"{\"name\": ").unwrap();

        let result: Result<Option<Record>> = store(&temp).read(&rel("bad.json"));
        assert!(matches!(result, Err(Error::StateParse { .. })));
    }
}
