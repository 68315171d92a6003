//! Manifest of prerequisites and registry items
//!
//! ```toml
//! [[prerequisites]]
//! type = "application"
//! name = "Git"
//! onMissing = "fail_backup"
//! checkCommand = "git --version"
//! expectedOutputPattern = 'git version \d+'
//!
//! [[registry]]
//! name = "Editor theme"
//! path = 'HKCU:\Software\Vendor\Editor'
//! keyName = "Theme"
//! dynamicStatePath = "registry/editor-theme.json"
//! valueData = "dark"
//! ```

use crate::error::{Error, Result};
use crate::prereq::Prerequisite;
use crate::state::RegistryItem;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Everything one backup or restore run operates on
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Checks gating the operation, in evaluation order
    #[serde(default)]
    pub prerequisites: Vec<Prerequisite>,
    /// Registry items, in processing order
    #[serde(default)]
    pub registry: Vec<RegistryItem>,
}

impl Manifest {
    /// Load and validate a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let manifest: Self = toml::from_str(&content).map_err(|source| Error::ManifestParse {
            path: path.to_path_buf(),
            source,
        })?;
        manifest.validate()?;

        tracing::debug!(
            prerequisites = manifest.prerequisites.len(),
            items = manifest.registry.len(),
            "Loaded manifest from {}",
            path.display()
        );
        Ok(manifest)
    }

    /// Reject manifests where two items would share one state file
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashMap<&Path, &str> = HashMap::new();
        for item in &self.registry {
            if let Some(other) = seen.insert(item.dynamic_state_path.as_path(), &item.name) {
                return Err(Error::InvalidConfig {
                    message: format!(
                        "registry items '{}' and '{}' share dynamicStatePath '{}'",
                        other, item.name, item.dynamic_state_path
                    ),
                });
            }
        }
        Ok(())
    }

    /// Whether any item needs the encryption primitive
    pub fn needs_protector(&self) -> bool {
        self.registry
            .iter()
            .any(|item| item.encrypt && item.key_name().is_some())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::prereq::{OnMissing, PrerequisiteCheck};
    use crate::state::ItemMode;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
[[prerequisites]]
type = "application"
name = "Git"
onMissing = "fail_backup"
checkCommand = "git --version"
expectedOutputPattern = 'git version \d+'

[[prerequisites]]
type = "script"
name = "Probe"
path = "checks/probe.sh"
expectedOutputPattern = "ready"

[[registry]]
name = "Editor theme"
path = 'HKCU:\Software\Vendor\Editor'
keyName = "Theme"
dynamicStatePath = "registry/editor-theme.json"
valueData = "dark"

[[registry]]
name = "Editor settings"
path = 'HKCU:\Software\Vendor\Editor'
dynamicStatePath = "registry/editor.json"
encrypt = true
"#;

    fn write(temp: &TempDir, content: &str) -> std::path::PathBuf {
        let path = temp.path().join("manifest.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_manifest() {
        let temp = TempDir::new().unwrap();
        let manifest = Manifest::load(&write(&temp, MANIFEST)).unwrap();

        assert_eq!(manifest.prerequisites.len(), 2);
        assert_eq!(manifest.prerequisites[0].on_missing, OnMissing::FailBackup);
        assert!(matches!(
            manifest.prerequisites[1].check,
            PrerequisiteCheck::Script { path: Some(_), .. }
        ));

        assert_eq!(manifest.registry.len(), 2);
        assert_eq!(manifest.registry[0].path, "HKCU:\\Software\\Vendor\\Editor");
        assert!(matches!(
            manifest.registry[0].mode,
            ItemMode::Value { value_data: Some(_), .. }
        ));
        assert_eq!(manifest.registry[1].mode, ItemMode::Key);
    }

    #[test]
    fn test_encrypted_key_item_does_not_need_protector() {
        let temp = TempDir::new().unwrap();
        let manifest = Manifest::load(&write(&temp, MANIFEST)).unwrap();
        assert!(!manifest.needs_protector());
    }

    #[test]
    fn test_empty_manifest() {
        let temp = TempDir::new().unwrap();
        let manifest = Manifest::load(&write(&temp, "")).unwrap();
        assert!(manifest.prerequisites.is_empty());
        assert!(manifest.registry.is_empty());
    }

    #[test]
    fn test_duplicate_state_path_rejected() {
        let temp = TempDir::new().unwrap();
        let content = r#"
[[registry]]
name = "A"
path = 'HKCU:\A'
dynamicStatePath = "same.json"

[[registry]]
name = "B"
path = 'HKCU:\B'
dynamicStatePath = "same.json"
"#;
        let err = Manifest::load(&write(&temp, content)).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_unknown_policy_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let content = r#"
[[prerequisites]]
type = "application"
name = "Git"
onMissing = "explode"
checkCommand = "git --version"
expectedOutputPattern = "git"
"#;
        assert!(matches!(
            Manifest::load(&write(&temp, content)),
            Err(Error::ManifestParse { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            Manifest::load(&temp.path().join("absent.toml")),
            Err(Error::Io(_))
        ));
    }
}
