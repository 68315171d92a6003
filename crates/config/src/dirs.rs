//! XDG directory utilities
//!
//! This module provides XDG-compliant directory paths for keepstate.
//! It follows the XDG Base Directory specification using the `xdg` crate:
//! - `XDG_CONFIG_HOME` defaults to ~/.config
//! - `XDG_DATA_HOME` defaults to ~/.local/share

use std::path::{Path, PathBuf};
use xdg::BaseDirectories;

/// Get the keepstate config directory
///
/// Returns `$XDG_CONFIG_HOME/keepstate` or `~/.config/keepstate`
#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    BaseDirectories::with_prefix("keepstate").get_config_home()
}

/// Get the keepstate data directory
///
/// Returns `$XDG_DATA_HOME/keepstate` or `~/.local/share/keepstate`
#[must_use]
pub fn data_dir() -> Option<PathBuf> {
    BaseDirectories::with_prefix("keepstate").get_data_home()
}

/// Get the default config file path
///
/// Returns `~/.config/keepstate/config.toml`
#[must_use]
pub fn default_config_file() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Get the default age identity file path
///
/// Returns `~/.config/keepstate/key.txt`
#[must_use]
pub fn default_age_identity() -> Option<PathBuf> {
    config_dir().map(|d| d.join("key.txt"))
}

/// Get the default manifest path
///
/// Returns `~/.config/keepstate/manifest.toml`
#[must_use]
pub fn default_manifest_file() -> Option<PathBuf> {
    config_dir().map(|d| d.join("manifest.toml"))
}

/// Get the default machine-specific backup directory
///
/// Returns `~/.local/share/keepstate/backup`
#[must_use]
pub fn default_machine_dir() -> Option<PathBuf> {
    data_dir().map(|d| d.join("backup"))
}

/// Get the default registry hive file
///
/// Returns `~/.local/share/keepstate/hive.json`
#[must_use]
pub fn default_hive_file() -> Option<PathBuf> {
    data_dir().map(|d| d.join("hive.json"))
}

/// Pick the state-files root for one operation
///
/// The machine directory wins if it exists, then the shared directory if it
/// exists. When neither exists the machine directory is returned so a
/// backup creates it.
#[must_use]
pub fn resolve_state_root(machine: &Path, shared: Option<&Path>) -> PathBuf {
    if machine.is_dir() {
        tracing::debug!("Using machine-specific state root {}", machine.display());
        return machine.to_path_buf();
    }

    if let Some(shared) = shared
        && shared.is_dir()
    {
        tracing::debug!("Using shared state root {}", shared.display());
        return shared.to_path_buf();
    }

    tracing::debug!(
        "No existing state root, defaulting to {}",
        machine.display()
    );
    machine.to_path_buf()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_config_dir_contains_prefix() {
        if let Some(path) = config_dir() {
            assert!(
                path.to_string_lossy().contains("keepstate"),
                "config_dir path should contain 'keepstate': {path:?}"
            );
        }
    }

    #[test]
    fn test_default_files_live_in_their_dirs() {
        if let (Some(config), Some(file), Some(key)) =
            (config_dir(), default_config_file(), default_age_identity())
        {
            assert!(file.starts_with(&config));
            assert!(key.starts_with(&config));
            assert!(default_manifest_file().unwrap().starts_with(&config));
            assert_eq!(file.file_name().and_then(|n| n.to_str()), Some("config.toml"));
            assert_eq!(key.file_name().and_then(|n| n.to_str()), Some("key.txt"));
        }

        if let (Some(data), Some(machine), Some(hive)) =
            (data_dir(), default_machine_dir(), default_hive_file())
        {
            assert!(machine.starts_with(&data));
            assert!(hive.starts_with(&data));
        }
    }

    #[test]
    fn test_resolve_prefers_existing_machine_dir() {
        let temp = TempDir::new().unwrap();
        let machine = temp.path().join("machine");
        let shared = temp.path().join("shared");
        fs::create_dir(&machine).unwrap();
        fs::create_dir(&shared).unwrap();

        assert_eq!(resolve_state_root(&machine, Some(&shared)), machine);
    }

    #[test]
    fn test_resolve_falls_back_to_shared() {
        let temp = TempDir::new().unwrap();
        let machine = temp.path().join("machine");
        let shared = temp.path().join("shared");
        fs::create_dir(&shared).unwrap();

        assert_eq!(resolve_state_root(&machine, Some(&shared)), shared);
    }

    #[test]
    fn test_resolve_defaults_to_machine_when_nothing_exists() {
        let temp = TempDir::new().unwrap();
        let machine = temp.path().join("machine");
        let shared = temp.path().join("shared");

        assert_eq!(resolve_state_root(&machine, Some(&shared)), machine);
        assert_eq!(resolve_state_root(&machine, None), machine);
    }

    #[test]
    fn test_resolve_ignores_plain_file() {
        let temp = TempDir::new().unwrap();
        let machine = temp.path().join("machine");
        fs::write(&machine, "not a directory").unwrap();
        let shared = temp.path().join("shared");
        fs::create_dir(&shared).unwrap();

        assert_eq!(resolve_state_root(&machine, Some(&shared)), shared);
    }
}
