//! In-memory registry hive

use super::{RegistryAccessor, RegistryValue, normalize_key};
use crate::Result;
use indexmap::IndexMap;
use std::cell::RefCell;

#[derive(Debug, Clone, Default)]
struct Key {
    /// Path as first written, for display and persistence
    path: String,
    values: IndexMap<String, RegistryValue>,
}

impl Key {
    fn get(&self, name: &str) -> Option<&RegistryValue> {
        self.values
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Overwrites a value matching `name` in any case, keeping its stored name
    fn set(&mut self, name: &str, value: &RegistryValue) {
        match self
            .values
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some((_, slot)) => *slot = value.clone(),
            None => {
                self.values.insert(name.to_string(), value.clone());
            }
        }
    }
}

/// Registry hive held in memory
///
/// Keys are independent: creating `A\B\C` does not make `A\B` exist.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    keys: RefCell<IndexMap<String, Key>>,
}

impl MemoryRegistry {
    /// Create an empty hive
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a hive from `path → values` pairs
    pub fn from_keys(keys: IndexMap<String, IndexMap<String, RegistryValue>>) -> Self {
        let registry = Self::new();
        {
            let mut map = registry.keys.borrow_mut();
            for (path, values) in keys {
                map.insert(normalize_key(&path), Key { path, values });
            }
        }
        registry
    }

    /// Snapshot of the hive as `path → values` pairs
    pub fn to_keys(&self) -> IndexMap<String, IndexMap<String, RegistryValue>> {
        self.keys
            .borrow()
            .values()
            .map(|key| (key.path.clone(), key.values.clone()))
            .collect()
    }
}

impl RegistryAccessor for MemoryRegistry {
    fn key_exists(&self, path: &str) -> Result<bool> {
        Ok(self.keys.borrow().contains_key(&normalize_key(path)))
    }

    fn get_value(&self, path: &str, name: &str) -> Result<Option<RegistryValue>> {
        Ok(self
            .keys
            .borrow()
            .get(&normalize_key(path))
            .and_then(|key| key.get(name).cloned()))
    }

    fn set_value(&self, path: &str, name: &str, value: &RegistryValue) -> Result<()> {
        self.keys
            .borrow_mut()
            .entry(normalize_key(path))
            .or_insert_with(|| Key {
                path: path.to_string(),
                values: IndexMap::new(),
            })
            .set(name, value);
        Ok(())
    }

    fn create_key(&self, path: &str) -> Result<()> {
        self.keys
            .borrow_mut()
            .entry(normalize_key(path))
            .or_insert_with(|| Key {
                path: path.to_string(),
                values: IndexMap::new(),
            });
        Ok(())
    }

    fn values(&self, path: &str) -> Result<IndexMap<String, RegistryValue>> {
        Ok(self
            .keys
            .borrow()
            .get(&normalize_key(path))
            .map(|key| key.values.clone())
            .unwrap_or_default())
    }
}
