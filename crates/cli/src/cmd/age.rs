//! Age identity management
//!
//! Commands for generating and showing the identities that encrypted
//! registry values are sealed to.

use anyhow::{Context, Result};
use keepstate_config::Config;
use keepstate_crypto::{Identity, save_identities};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

/// Generate a new age identity
///
/// # Errors
///
/// Returns an error if no output path is given and the config directory
/// cannot be determined, if the target already exists, or if the identity
/// file cannot be written.
pub fn generate(output: Option<PathBuf>) -> Result<()> {
    let output_path = match output {
        Some(path) => path,
        None => keepstate_config::dirs::default_age_identity().ok_or_else(|| {
            anyhow::anyhow!(
                "Could not determine config directory. Please specify output path with --output."
            )
        })?,
    };

    if output_path.exists() {
        anyhow::bail!(
            "Identity file already exists: {}. Remove it first or choose another --output.",
            output_path.display()
        );
    }

    let identity = Identity::generate();
    let public_key = identity.to_public();

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    save_identities(&output_path, &[identity]).context("Failed to save identity file")?;

    println!("Generated new age identity");
    println!("Private key saved to: {}", output_path.display());
    println!("\nPublic key: {public_key}");
    println!("\nKeep your private key secure! Encrypted state files cannot be restored without it.");

    Ok(())
}

/// Show configured identities and their public keys
///
/// # Errors
///
/// Returns an error if a configured identity file is missing or cannot be
/// loaded while another one exists.
pub fn show(config: &Config) -> Result<()> {
    println!("{}", "Age Identities".bright_white().bold());
    println!();

    let paths = config.identity_paths();
    for (i, path) in paths.iter().enumerate() {
        let label = if i == 0 { "Identity" } else { "" };
        print_item(label, path, path.exists());
    }

    if !paths.iter().any(|path| path.exists()) {
        println!(
            "  {} {:14} {}",
            "✗".bright_red(),
            "Status",
            "No identities found. Run `keepstate age generate`.".dimmed()
        );
        return Ok(());
    }

    let identities = config
        .age_identities()
        .context("Failed to load age identities")?;

    println!();
    println!("{}", "Public Keys".bright_white().bold());
    println!();

    for (i, identity) in identities.iter().enumerate() {
        let label = match (i, identities.len()) {
            (0, 1) => "Public key",
            (0, _) => "Public keys",
            _ => "",
        };
        println!(
            "  {} {label:14} {}",
            "✓".bright_green(),
            identity.to_public().to_string().bright_white()
        );
    }

    if !config.age.recipients.is_empty() {
        println!();
        println!("{}", "Extra Recipients".bright_white().bold());
        println!();
        for recipient in &config.age.recipients {
            println!("  {} {:14} {}", "✓".bright_green(), "", recipient.bright_white());
        }
    }

    Ok(())
}

/// Print an identity path with an existence marker
fn print_item(label: &str, path: &Path, ok: bool) {
    let value = path.display().to_string();
    if ok {
        println!("  {} {label:14} {}", "✓".bright_green(), value.bright_white());
    } else {
        println!(
            "  {} {label:14} {} {}",
            "✗".bright_red(),
            value.dimmed(),
            "(missing)".dimmed()
        );
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generate_writes_loadable_identity() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/key.txt");

        generate(Some(path.clone())).unwrap();

        let loaded = keepstate_crypto::load_identities(&path).unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn test_generate_refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("key.txt");
        generate(Some(path.clone())).unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        assert!(generate(Some(path.clone())).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_show_with_generated_identity() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("key.txt");
        generate(Some(path.clone())).unwrap();

        let mut config = Config::default();
        config.age.identity = Some(path);
        show(&config).unwrap();
    }
}
