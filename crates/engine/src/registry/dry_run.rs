//! Dry-run registry wrapper

use super::{RegistryAccessor, RegistryValue};
use crate::Result;
use indexmap::IndexMap;
use std::cell::RefCell;

/// A registry write that would have been performed
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryWrite {
    /// Set a named value
    SetValue {
        path: String,
        name: String,
        value: RegistryValue,
    },
    /// Create a key
    CreateKey { path: String },
}

/// Reads through to `inner`, records writes instead of applying them
///
/// Reads do not observe recorded writes.
pub struct DryRunRegistry<'a> {
    inner: &'a dyn RegistryAccessor,
    writes: RefCell<Vec<RegistryWrite>>,
}

impl<'a> DryRunRegistry<'a> {
    /// Wrap a live backend
    pub fn new(inner: &'a dyn RegistryAccessor) -> Self {
        Self {
            inner,
            writes: RefCell::new(Vec::new()),
        }
    }

    /// Writes recorded so far, in order
    pub fn writes(&self) -> Vec<RegistryWrite> {
        self.writes.borrow().clone()
    }
}

impl RegistryAccessor for DryRunRegistry<'_> {
    fn key_exists(&self, path: &str) -> Result<bool> {
        self.inner.key_exists(path)
    }

    fn get_value(&self, path: &str, name: &str) -> Result<Option<RegistryValue>> {
        self.inner.get_value(path, name)
    }

    fn set_value(&self, path: &str, name: &str, value: &RegistryValue) -> Result<()> {
        self.writes.borrow_mut().push(RegistryWrite::SetValue {
            path: path.to_string(),
            name: name.to_string(),
            value: value.clone(),
        });
        Ok(())
    }

    fn create_key(&self, path: &str) -> Result<()> {
        self.writes.borrow_mut().push(RegistryWrite::CreateKey {
            path: path.to_string(),
        });
        Ok(())
    }

    fn values(&self, path: &str) -> Result<IndexMap<String, RegistryValue>> {
        self.inner.values(path)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::registry::MemoryRegistry;

    #[test]
    fn test_writes_are_recorded_not_applied() {
        let live = MemoryRegistry::new();
        let dry = DryRunRegistry::new(&live);

        dry.create_key("HKCU:\\Software\\A").unwrap();
        dry.set_value("HKCU:\\Software\\A", "X", &"1".into()).unwrap();

        assert!(!live.key_exists("HKCU:\\Software\\A").unwrap());
        assert_eq!(dry.writes().len(), 2);
        assert_eq!(
            dry.writes()[1],
            RegistryWrite::SetValue {
                path: "HKCU:\\Software\\A".to_string(),
                name: "X".to_string(),
                value: "1".into(),
            }
        );
    }

    #[test]
    fn test_reads_pass_through() {
        let live = MemoryRegistry::new();
        live.set_value("HKCU:\\Software\\A", "X", &true.into()).unwrap();

        let dry = DryRunRegistry::new(&live);
        assert!(dry.key_exists("HKCU:\\Software\\A").unwrap());
        assert_eq!(dry.values("HKCU:\\Software\\A").unwrap().len(), 1);
    }
}
