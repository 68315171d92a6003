//! Registry State Engine
//!
//! Captures a single registry item (one named value, or every value under a
//! key) into a JSON state file, and replays a state file back into the
//! registry.
//!
//! A state file for a value item looks like:
//!
//! ```json
//! {
//!   "Name": "Editor theme",
//!   "Path": "HKCU:\\Software\\Vendor\\Editor",
//!   "KeyName": "Theme",
//!   "Type": "value",
//!   "Value": "dark"
//! }
//! ```
//!
//! Key items carry `"Type": "key"` and a `"Values"` object instead.

use crate::error::{Error, Result};
use crate::registry::{RegistryAccessor, RegistryValue, ValueKind};
use crate::store::StateStore;
use indexmap::IndexMap;
use keepstate_core::Protector;
use keepstate_core::path::RelPath;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Direction an item was declared for
///
/// Informational only: the command being run decides whether an item is
/// captured or replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemAction {
    /// Declared for backup
    #[default]
    Backup,
    /// Declared for restore
    Restore,
}

/// What part of the registry an item covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemMode {
    /// A single named value
    Value {
        /// Name of the value under the key
        key_name: String,
        /// Written on replay when no state file exists
        value_data: Option<RegistryValue>,
    },
    /// Every value directly under the key
    Key,
}

/// One registry item from the manifest
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawRegistryItem")]
pub struct RegistryItem {
    /// Display name
    pub name: String,
    /// Fully-qualified key path
    pub path: String,
    /// Value or whole-key mode
    pub mode: ItemMode,
    /// Declared direction
    pub action: ItemAction,
    /// State file location under the state-files root
    pub dynamic_state_path: RelPath,
    /// Protect the captured value (value mode only)
    pub encrypt: bool,
}

impl RegistryItem {
    /// Item covering one named value
    pub fn value(
        name: impl Into<String>,
        path: impl Into<String>,
        key_name: impl Into<String>,
        dynamic_state_path: RelPath,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            mode: ItemMode::Value {
                key_name: key_name.into(),
                value_data: None,
            },
            action: ItemAction::default(),
            dynamic_state_path,
            encrypt: false,
        }
    }

    /// Item covering every value under a key
    pub fn key(name: impl Into<String>, path: impl Into<String>, dynamic_state_path: RelPath) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            mode: ItemMode::Key,
            action: ItemAction::default(),
            dynamic_state_path,
            encrypt: false,
        }
    }

    /// Set the encrypt flag
    #[must_use]
    pub fn encrypted(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }

    /// Set the default written on replay when no state exists
    ///
    /// Ignored for key items.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<RegistryValue>) -> Self {
        if let ItemMode::Value { value_data, .. } = &mut self.mode {
            *value_data = Some(default.into());
        }
        self
    }

    /// Value name for value items
    pub fn key_name(&self) -> Option<&str> {
        match &self.mode {
            ItemMode::Value { key_name, .. } => Some(key_name),
            ItemMode::Key => None,
        }
    }
}

impl fmt::Display for RegistryItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.mode {
            ItemMode::Value { key_name, .. } => write!(f, "{}\\{}", self.path, key_name),
            ItemMode::Key => f.write_str(&self.path),
        }
    }
}

/// Manifest shape of a registry item
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawRegistryItem {
    name: String,
    path: String,
    #[serde(default)]
    key_name: Option<String>,
    #[serde(default)]
    action: ItemAction,
    dynamic_state_path: PathBuf,
    #[serde(default)]
    encrypt: bool,
    #[serde(default)]
    value_data: Option<RegistryValue>,
}

impl TryFrom<RawRegistryItem> for RegistryItem {
    type Error = Error;

    fn try_from(raw: RawRegistryItem) -> Result<Self> {
        if raw.name.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: "registry item has an empty name".to_string(),
            });
        }
        if raw.path.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: format!("registry item '{}' has an empty path", raw.name),
            });
        }

        let dynamic_state_path =
            RelPath::new(raw.dynamic_state_path).map_err(|e| Error::InvalidConfig {
                message: format!("registry item '{}' has an invalid dynamicStatePath: {e}", raw.name),
            })?;

        let mode = match raw.key_name {
            Some(key_name) => ItemMode::Value {
                key_name,
                value_data: raw.value_data,
            },
            None => {
                if raw.value_data.is_some() {
                    tracing::warn!(item = %raw.name, "valueData is ignored for key items");
                }
                ItemMode::Key
            }
        };

        Ok(Self {
            name: raw.name,
            path: raw.path,
            mode,
            action: raw.action,
            dynamic_state_path,
            encrypt: raw.encrypt,
        })
    }
}

/// Captured contents, tagged by item type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "Type", rename_all = "lowercase", rename_all_fields = "PascalCase")]
pub enum CapturedData {
    /// A single value; a protected token when the item is encrypted
    Value {
        value: RegistryValue,
        /// Original scalar type of a protected value
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value_kind: Option<ValueKind>,
    },
    /// Every value under the key
    Key {
        values: IndexMap<String, RegistryValue>,
    },
}

/// Record persisted for one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CapturedRegistryState {
    /// Item display name
    pub name: String,
    /// Key path
    pub path: String,
    /// Value name, for value records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    /// Captured contents
    #[serde(flatten)]
    pub data: CapturedData,
}

/// Captures and replays registry items against a [`StateStore`]
pub struct RegistryStateEngine<'a> {
    registry: &'a dyn RegistryAccessor,
    store: StateStore<'a>,
    protector: Option<&'a dyn Protector>,
}

impl<'a> RegistryStateEngine<'a> {
    /// Create an engine without an encryption primitive
    ///
    /// Items with `encrypt = true` fail until [`Self::with_protector`] is used.
    pub fn new(registry: &'a dyn RegistryAccessor, store: StateStore<'a>) -> Self {
        Self {
            registry,
            store,
            protector: None,
        }
    }

    /// Use `protector` for encrypted items
    #[must_use]
    pub fn with_protector(mut self, protector: &'a dyn Protector) -> Self {
        self.protector = Some(protector);
        self
    }

    /// The store this engine reads and writes
    pub fn store(&self) -> &StateStore<'a> {
        &self.store
    }

    /// Capture `item` and write its state file
    ///
    /// Returns `Ok(None)` without writing anything when the key, or the named
    /// value, does not exist.
    #[tracing::instrument(skip(self, item), fields(item = %item.name))]
    pub fn capture(&self, item: &RegistryItem) -> Result<Option<CapturedRegistryState>> {
        if !self.registry.key_exists(&item.path)? {
            tracing::warn!("Registry path not found: {}", item.path);
            return Ok(None);
        }

        let (key_name, data) = match &item.mode {
            ItemMode::Value { key_name, .. } => {
                let Some(value) = self.registry.get_value(&item.path, key_name)? else {
                    tracing::warn!("Registry value not found: {}", item);
                    return Ok(None);
                };
                let data = if item.encrypt {
                    let protector = self.protector(item)?;
                    CapturedData::Value {
                        value: RegistryValue::String(
                            protector.protect(value.to_string().as_bytes())?,
                        ),
                        value_kind: Some(value.kind()),
                    }
                } else {
                    CapturedData::Value {
                        value,
                        value_kind: None,
                    }
                };
                (Some(key_name.clone()), data)
            }
            ItemMode::Key => {
                if item.encrypt {
                    tracing::debug!("encrypt applies to value items only; storing key values as-is");
                }
                let values = self.registry.values(&item.path)?;
                tracing::debug!(count = values.len(), "Enumerated key values");
                (None, CapturedData::Key { values })
            }
        };

        let record = CapturedRegistryState {
            name: item.name.clone(),
            path: item.path.clone(),
            key_name,
            data,
        };

        let written = self
            .store
            .write(&item.dynamic_state_path, &item.name, &record)?;
        tracing::debug!(path = %written, "Captured registry state");
        Ok(Some(record))
    }

    /// Replay the state file for `item` into the registry
    ///
    /// A missing (or unreadable) state file falls back to the item's default
    /// value, or does nothing. Decode failures are returned as errors.
    #[tracing::instrument(skip(self, item), fields(item = %item.name))]
    pub fn replay(&self, item: &RegistryItem) -> Result<()> {
        let Some(record) = self.load(item)? else {
            return self.replay_default(item);
        };

        match record.data {
            CapturedData::Value { value, value_kind } => {
                let Some(key_name) = item.key_name().or(record.key_name.as_deref()) else {
                    return Err(Error::InvalidConfig {
                        message: format!(
                            "state for '{}' holds a single value but names no value",
                            item.name
                        ),
                    });
                };
                let value = if item.encrypt {
                    self.decode(item, &value, value_kind)?
                } else {
                    value
                };
                self.registry.set_value(&item.path, key_name, &value)?;
                tracing::debug!("Restored value {}\\{}", item.path, key_name);
            }
            CapturedData::Key { values } => {
                self.registry.create_key(&item.path)?;
                for (name, value) in &values {
                    self.registry.set_value(&item.path, name, value)?;
                }
                tracing::debug!(count = values.len(), "Restored key values");
            }
        }

        Ok(())
    }

    fn load(&self, item: &RegistryItem) -> Result<Option<CapturedRegistryState>> {
        match self.store.read(&item.dynamic_state_path) {
            Ok(record) => Ok(record),
            Err(Error::StateParse { path, source }) => {
                tracing::warn!("Ignoring unparseable state file {}: {}", path, source);
                Ok(None)
            }
            Err(Error::FileRead { path, source }) => {
                tracing::warn!("Ignoring unreadable state file {}: {}", path, source);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn replay_default(&self, item: &RegistryItem) -> Result<()> {
        let state_path = self.store.path_for(&item.dynamic_state_path);
        match &item.mode {
            ItemMode::Value {
                key_name,
                value_data: Some(default),
            } => {
                tracing::debug!("No state file at {}, writing default value", state_path);
                self.registry.set_value(&item.path, key_name, default)
            }
            ItemMode::Value {
                value_data: None, ..
            }
            | ItemMode::Key => {
                tracing::warn!("State file not found: {}", state_path);
                Ok(())
            }
        }
    }

    fn decode(
        &self,
        item: &RegistryItem,
        value: &RegistryValue,
        kind: Option<ValueKind>,
    ) -> Result<RegistryValue> {
        let protector = self.protector(item)?;
        let token = value.as_str().ok_or_else(|| Error::InvalidProtectedValue {
            name: item.name.clone(),
        })?;

        let bytes = protector.unprotect(token)?;
        let text = String::from_utf8(bytes).map_err(|source| Error::InvalidUtf8 {
            name: item.name.clone(),
            source,
        })?;

        let kind = kind.unwrap_or(ValueKind::String);
        kind.parse(&text).ok_or_else(|| Error::InvalidScalar {
            name: item.name.clone(),
            kind: kind.to_string(),
            text,
        })
    }

    fn protector(&self, item: &RegistryItem) -> Result<&'a dyn Protector> {
        self.protector.ok_or_else(|| Error::MissingProtector {
            name: item.name.clone(),
        })
    }
}
