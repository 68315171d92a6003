//! Keepstate CLI library
//!
//! This library contains all the CLI logic for keepstate, making it reusable
//! for testing and integration with other tools.

pub mod cmd;
pub mod command;
pub mod common;
pub mod error;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use command::Command;
use common::RuntimeContext;

/// Keepstate - declarative registry backup and restore
#[derive(Parser)]
#[command(name = "keepstate")]
#[command(about = "Back up and restore registry settings from a manifest")]
#[command(version)]
#[command(long_about = "Back up and restore registry settings from a manifest

Each registry item names a key (or a single value under it) and the state
file it is captured to. Prerequisites gate every run: an application that
must be installed, a registry value that must match, or a script whose
output must match a pattern.

Registry keys and values are read from and written to a JSON hive file
(--hive, general.hive). The native Windows registry is never accessed.

Features:
  • Value and whole-key capture with type-preserving replay
  • Age encryption for sensitive values
  • Per-prerequisite failure policies for backup and restore
  • Dry-run mode for both directions")]
pub struct Cli {
    /// Path to the config file
    #[arg(long, env = "KEEPSTATE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the manifest (overrides general.manifest)
    #[arg(short, long, env = "KEEPSTATE_MANIFEST", value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Path to the JSON registry hive file (overrides general.hive)
    ///
    /// All registry reads and writes go to this file, not to the native
    /// Windows registry.
    #[arg(long, env = "KEEPSTATE_HIVE", value_name = "FILE")]
    pub hive: Option<PathBuf>,

    /// State-files root (overrides machine/shared directory resolution)
    #[arg(long, env = "KEEPSTATE_STATE_DIR", value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Enable verbose output (shows DEBUG level logs)
    #[arg(short, long)]
    pub verbose: bool,

    /// Write logs to a file (useful for debugging)
    #[arg(long, env = "KEEPSTATE_LOG_FILE", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for keepstate CLI
#[derive(Subcommand)]
pub enum Commands {
    /// Capture registry state into state files
    Backup(cmd::backup::BackupCommand),

    /// Replay state files into the registry
    Restore(cmd::restore::RestoreCommand),

    /// Evaluate prerequisites without backing up or restoring
    Check(cmd::check::CheckCommand),

    /// Manage age identities used for encrypted values
    #[command(subcommand)]
    Age(AgeCommands),
}

/// Age encryption management commands
#[derive(Subcommand)]
pub enum AgeCommands {
    /// Generate a new age identity
    Generate {
        /// Output file (default: ~/.config/keepstate/key.txt)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show configured identities and public keys
    Show,
}

/// Run the CLI with parsed arguments
///
/// # Errors
///
/// Returns an error if logging or configuration cannot be set up, or if the
/// command fails.
pub fn run(cli: Cli) -> Result<()> {
    keepstate_config::logging::init(cli.verbose, cli.log_file.as_deref())
        .context("Failed to initialize logging")?;

    let config = load_config(cli.config.as_deref())?;

    let command = match cli.command {
        Commands::Age(age_cmd) => {
            return match age_cmd {
                AgeCommands::Generate { output } => cmd::age::generate(output),
                AgeCommands::Show => cmd::age::show(&config),
            };
        }
        command => command,
    };

    let context = RuntimeContext::new(
        config,
        cli.manifest.as_deref(),
        cli.hive.as_deref(),
        cli.state_dir.as_deref(),
    )?;
    tracing::debug!(
        manifest = %context.manifest_path.display(),
        hive = %context.hive_path.display(),
        state_root = %context.state_root,
        "Resolved runtime paths"
    );

    execute_command(command, &context)
}

/// Load the config file given on the command line, or the default one
///
/// A missing default config file yields default settings; a missing
/// explicitly named one is an error.
fn load_config(path: Option<&Path>) -> Result<keepstate_config::Config> {
    match path {
        Some(path) => keepstate_config::Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => match keepstate_config::default_config_file() {
            Some(path) => keepstate_config::Config::load_or_default(&path)
                .with_context(|| format!("Failed to load config from {}", path.display())),
            None => Ok(keepstate_config::Config::default()),
        },
    }
}

fn execute_command(command: Commands, context: &RuntimeContext) -> Result<()> {
    match command {
        Commands::Backup(backup_cmd) => {
            let summary = backup_cmd.execute(context)?;
            tracing::info!(
                captured = summary.captured,
                skipped = summary.skipped,
                "Backup finished"
            );
        }
        Commands::Restore(restore_cmd) => {
            let restored = restore_cmd.execute(context)?;
            tracing::info!(restored, "Restore finished");
        }
        Commands::Check(check_cmd) => {
            check_cmd.execute(context)?;
        }
        Commands::Age(_) => unreachable!("Age commands are handled before context creation"),
    }
    Ok(())
}
