//! Common utilities and types shared across CLI commands

use crate::error::{CommandError, Result};
use keepstate_config::Config;
use keepstate_core::path::AbsPath;
use keepstate_crypto::AgeProtector;
use keepstate_engine::registry::FileRegistry;
use keepstate_engine::{Manifest, ShellRunner};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Runtime context for CLI commands
///
/// Holds the configuration plus the paths every manifest-driven command
/// needs, resolved once from CLI flags, config values and defaults (in that
/// order).
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    /// Shared configuration
    pub config: Arc<Config>,
    /// Manifest file
    pub manifest_path: PathBuf,
    /// Registry hive file
    pub hive_path: PathBuf,
    /// State-files root for this run
    pub state_root: AbsPath,
}

impl RuntimeContext {
    /// Resolve paths for a run
    ///
    /// # Errors
    ///
    /// Returns an error if a path has no flag, config value or default.
    pub fn new(
        config: Config,
        manifest: Option<&Path>,
        hive: Option<&Path>,
        state_dir: Option<&Path>,
    ) -> Result<Self> {
        let manifest_path = match manifest {
            Some(path) => path.to_path_buf(),
            None => config.manifest_file().map_err(CommandError::config)?,
        };
        let hive_path = match hive {
            Some(path) => path.to_path_buf(),
            None => config.hive_file().map_err(CommandError::config)?,
        };
        let state_root = match state_dir {
            Some(path) => path.to_path_buf(),
            None => config.state_root().map_err(CommandError::config)?,
        };

        Ok(Self {
            config: Arc::new(config),
            manifest_path,
            hive_path,
            state_root: AbsPath::resolve(&state_root)?,
        })
    }

    /// Load the manifest
    pub fn manifest(&self) -> Result<Manifest> {
        Ok(Manifest::load(&self.manifest_path)?)
    }

    /// Directory relative script paths resolve against
    pub fn manifest_dir(&self) -> PathBuf {
        self.manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Open the registry hive
    pub fn registry(&self) -> Result<FileRegistry> {
        Ok(FileRegistry::open(&self.hive_path)?)
    }

    /// Process runner for prerequisite checks
    pub fn runner(&self) -> ShellRunner {
        ShellRunner::new().with_base_dir(self.manifest_dir())
    }

    /// Encryption primitive, loaded only if some item needs it
    pub fn protector_for(&self, manifest: &Manifest) -> Result<Option<AgeProtector>> {
        if !manifest.needs_protector() {
            return Ok(None);
        }
        self.config
            .protector()
            .map(Some)
            .map_err(CommandError::encryption)
    }
}
