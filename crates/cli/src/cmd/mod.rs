//! Command implementations

pub mod age;
pub mod backup;
pub mod check;
pub mod restore;

use anyhow::anyhow;
use keepstate_engine::{CheckStatus, PrerequisiteOutcome, RegistryItem};
use owo_colors::OwoColorize;

use crate::error::Result;

/// Print one line per evaluated prerequisite
pub(crate) fn print_outcomes(outcomes: &[PrerequisiteOutcome]) {
    for outcome in outcomes {
        match outcome.status {
            CheckStatus::Passed => {
                println!("  {} {}", "✓".bright_green(), outcome.name);
            }
            CheckStatus::Warned => {
                println!(
                    "  {} {} {}",
                    "!".bright_yellow(),
                    outcome.name,
                    "(failed, continuing)".dimmed()
                );
            }
        }
    }
}

/// Print the status of one processed item
pub(crate) fn print_item(symbol: &str, item: &RegistryItem, detail: &str) {
    println!("  {symbol} {:24} {}", item.name, detail.dimmed());
}

/// Restrict `items` to the given names, keeping manifest order
///
/// An empty filter selects every item. Naming an item the manifest does not
/// contain is an error.
pub(crate) fn select_items<'m>(
    items: &'m [RegistryItem],
    names: &[String],
) -> Result<Vec<&'m RegistryItem>> {
    if names.is_empty() {
        return Ok(items.iter().collect());
    }

    if let Some(unknown) = names
        .iter()
        .find(|name| !items.iter().any(|item| &item.name == *name))
    {
        return Err(anyhow!("No registry item named '{unknown}' in the manifest").into());
    }

    Ok(items
        .iter()
        .filter(|item| names.contains(&item.name))
        .collect())
}
