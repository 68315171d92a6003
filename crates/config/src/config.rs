//! Configuration management
//!
//! This module handles loading and saving keepstate configuration.
//!
//! ```toml
//! [general]
//! machineDir = "/backups/host-a"
//! sharedDir = "/backups/shared"
//! hive = "~/.local/share/keepstate/hive.json"
//! manifest = "manifest.toml"
//!
//! [age]
//! identity = "~/.config/keepstate/key.txt"
//! ```

use crate::Result;
use crate::dirs;
use keepstate_core::Error;
use keepstate_crypto::{AgeProtector, Identity, Recipient};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// General configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneralConfig {
    /// Machine-specific backup root
    #[serde(default, rename = "machineDir")]
    pub machine_dir: Option<PathBuf>,

    /// Backup root shared between machines
    #[serde(default, rename = "sharedDir")]
    pub shared_dir: Option<PathBuf>,

    /// Registry hive file
    #[serde(default)]
    pub hive: Option<PathBuf>,

    /// Manifest of prerequisites and registry items
    #[serde(default)]
    pub manifest: Option<PathBuf>,
}

/// Age encryption configuration
///
/// ```toml
/// [age]
/// identity = "~/.config/keepstate/key.txt"
/// recipients = ["age1..."]  # extra keys that can also decrypt
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgeConfig {
    /// Single identity file path
    /// Can use ~ for home directory
    #[serde(default)]
    pub identity: Option<PathBuf>,

    /// Multiple identity file paths
    #[serde(default)]
    pub identities: Option<Vec<PathBuf>>,

    /// Additional recipient public keys
    ///
    /// Values are always encrypted to the identities' own public keys as
    /// well, so a backup can be restored with the configured identity.
    #[serde(default)]
    pub recipients: Vec<String>,
}

/// Keepstate configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// General configuration section
    #[serde(default)]
    pub general: GeneralConfig,

    /// Age encryption configuration
    #[serde(default)]
    pub age: AgeConfig,
}

impl Config {
    /// Load configuration from a file
    ///
    /// Relative paths in the file resolve against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or TOML parsing fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Message(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(&content, base_dir).map_err(|e| {
            Error::Message(format!("Failed to parse config file {}: {e}", path.display()))
        })
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML, resolving paths against `base_dir`
    ///
    /// # Errors
    ///
    /// Returns error if TOML parsing fails
    pub fn from_toml_str(toml_content: &str, base_dir: &Path) -> Result<Self> {
        let mut config: Self = toml::from_str(toml_content)
            .map_err(|e| Error::Message(format!("Failed to parse config TOML: {e}")))?;
        config.resolve_relative_paths(base_dir);
        Ok(config)
    }

    fn resolve_relative_paths(&mut self, base_dir: &Path) {
        for path in [
            &mut self.general.machine_dir,
            &mut self.general.shared_dir,
            &mut self.general.hive,
            &mut self.general.manifest,
            &mut self.age.identity,
        ]
        .into_iter()
        .flatten()
        {
            *path = Self::resolve_path(path, base_dir);
        }

        if let Some(identities) = &mut self.age.identities {
            for path in identities {
                *path = Self::resolve_path(path, base_dir);
            }
        }
    }

    /// Expand `~/` and resolve relative paths against `base_dir`
    fn resolve_path(path: &Path, base_dir: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();

        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = ::dirs::home_dir() {
                return home.join(stripped);
            }
        } else if path_str == "~"
            && let Some(home) = ::dirs::home_dir()
        {
            return home;
        }

        if path.is_relative() {
            base_dir.join(path)
        } else {
            path.to_path_buf()
        }
    }

    /// Machine-specific backup root, configured or default
    pub fn machine_dir(&self) -> Result<PathBuf> {
        self.general
            .machine_dir
            .clone()
            .or_else(dirs::default_machine_dir)
            .ok_or_else(|| {
                Error::Message(
                    "Cannot determine a backup directory; set general.machineDir".to_string(),
                )
            })
    }

    /// State-files root for this run
    ///
    /// See [`dirs::resolve_state_root`] for the priority rules.
    pub fn state_root(&self) -> Result<PathBuf> {
        let machine = self.machine_dir()?;
        Ok(dirs::resolve_state_root(
            &machine,
            self.general.shared_dir.as_deref(),
        ))
    }

    /// Registry hive file, configured or default
    pub fn hive_file(&self) -> Result<PathBuf> {
        self.general
            .hive
            .clone()
            .or_else(dirs::default_hive_file)
            .ok_or_else(|| {
                Error::Message("Cannot determine a hive file; set general.hive".to_string())
            })
    }

    /// Manifest file, configured or default
    pub fn manifest_file(&self) -> Result<PathBuf> {
        self.general
            .manifest
            .clone()
            .or_else(dirs::default_manifest_file)
            .ok_or_else(|| {
                Error::Message("Cannot determine a manifest file; set general.manifest".to_string())
            })
    }

    /// Configured identity files, or the default key file
    pub fn identity_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.age.identity.iter().cloned().collect();
        if let Some(identities) = &self.age.identities {
            paths.extend(identities.iter().cloned());
        }
        if paths.is_empty() {
            paths.extend(dirs::default_age_identity());
        }
        paths
    }

    /// Parse the extra recipients
    ///
    /// # Errors
    ///
    /// Returns error if a recipient string is not an age public key
    pub fn age_recipients(&self) -> Result<Vec<Recipient>> {
        self.age
            .recipients
            .iter()
            .map(|recipient| {
                recipient.parse::<Recipient>().map_err(|e| {
                    Error::Message(format!("Failed to parse recipient '{recipient}': {e}"))
                })
            })
            .collect()
    }

    /// Load all age identities from configuration
    ///
    /// # Errors
    ///
    /// Returns error if an identity file is missing or holds no identities
    pub fn age_identities(&self) -> Result<Vec<Identity>> {
        let mut all_identities = Vec::new();

        for identity_path in self.identity_paths() {
            let identities = keepstate_crypto::load_identities(&identity_path).map_err(|e| {
                Error::Message(format!(
                    "Failed to load identity from {}: {e}",
                    identity_path.display()
                ))
            })?;
            all_identities.extend(identities);
        }

        if all_identities.is_empty() {
            return Err(Error::Message(
                "No identity file configured. Add to your config.toml:\n\n\
                 [age]\n\
                 identity = \"~/.config/keepstate/key.txt\"\n\n\
                 Generate one with: keepstate age generate"
                    .to_string(),
            ));
        }

        Ok(all_identities)
    }

    /// Build the encoding primitive from the configured keys
    ///
    /// Encrypts to every identity's public key plus the extra recipients.
    pub fn protector(&self) -> Result<AgeProtector> {
        let identities = self.age_identities()?;
        let mut recipients: Vec<Recipient> = identities.iter().map(Identity::to_public).collect();
        recipients.extend(self.age_recipients()?);
        Ok(AgeProtector::new(recipients, identities))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use keepstate_core::Protector;
    use tempfile::TempDir;

    fn create_test_config(toml_content: &str) -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, toml_content).unwrap();
        (temp_dir, config_path)
    }

    #[test]
    fn test_load_empty_config() {
        let (_temp, path) = create_test_config("");
        let config = Config::load(&path).unwrap();
        assert!(config.general.machine_dir.is_none());
        assert!(config.age.identity.is_none());
    }

    #[test]
    fn test_load_general_section() {
        let (_temp, path) = create_test_config(
            r#"
[general]
machineDir = "/backups/host-a"
sharedDir = "/backups/shared"
"#,
        );
        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.general.machine_dir,
            Some(PathBuf::from("/backups/host-a"))
        );
        assert_eq!(
            config.general.shared_dir,
            Some(PathBuf::from("/backups/shared"))
        );
    }

    #[test]
    fn test_relative_paths_resolve_against_config_dir() {
        let (temp, path) = create_test_config(
            r#"
[general]
machineDir = "./machine"

[age]
identity = "key.txt"
"#,
        );
        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.general.machine_dir,
            Some(temp.path().join("./machine"))
        );
        assert_eq!(config.age.identity, Some(temp.path().join("key.txt")));
    }

    #[test]
    fn test_tilde_expansion() {
        let config =
            Config::from_toml_str("[age]\nidentity = \"~/key.txt\"\n", Path::new("/base")).unwrap();
        if let Some(home) = ::dirs::home_dir() {
            assert_eq!(config.age.identity, Some(home.join("key.txt")));
        }
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let (_temp, path) = create_test_config("[general\nmachineDir = ");
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_or_default(temp.path().join("absent.toml")).unwrap();
        assert!(config.general.machine_dir.is_none());
    }

    #[test]
    fn test_state_root_uses_shared_when_machine_missing() {
        let temp = TempDir::new().unwrap();
        let shared = temp.path().join("shared");
        fs::create_dir(&shared).unwrap();

        let mut config = Config::default();
        config.general.machine_dir = Some(temp.path().join("machine"));
        config.general.shared_dir = Some(shared.clone());

        assert_eq!(config.state_root().unwrap(), shared);
    }

    #[test]
    fn test_invalid_recipient_is_error() {
        let mut config = Config::default();
        config.age.recipients = vec!["not-a-key".to_string()];
        assert!(config.age_recipients().is_err());
    }

    #[test]
    fn test_missing_identity_is_error() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.age.identity = Some(temp.path().join("absent.txt"));
        assert!(config.age_identities().is_err());
    }

    #[test]
    fn test_protector_roundtrip() {
        let temp = TempDir::new().unwrap();
        let key = temp.path().join("key.txt");
        keepstate_crypto::save_identities(&key, &[Identity::generate()]).unwrap();

        let mut config = Config::default();
        config.age.identity = Some(key);
        config.age.recipients = vec![Identity::generate().to_public().to_string()];

        let protector = config.protector().unwrap();
        let token = protector.protect(b"OriginalData").unwrap();
        assert_eq!(protector.unprotect(&token).unwrap(), b"OriginalData");
    }
}
