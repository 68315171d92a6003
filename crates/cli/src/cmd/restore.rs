//! Restore command implementation
//!
//! Evaluates prerequisites for a restore, then replays each selected item's
//! state file into the registry.

use clap::Args;
use keepstate_engine::registry::{DryRunRegistry, RegistryWrite};
use keepstate_engine::{
    Operation, PrerequisiteEngine, RealSystem, RegistryAccessor, RegistryStateEngine, StateStore,
};
use owo_colors::OwoColorize;

use crate::cmd::{print_item, print_outcomes, select_items};
use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::{CommandError, Result};

/// Replay state files into the registry
#[derive(Debug, Default, Args)]
pub struct RestoreCommand {
    /// Item names to restore (all items if omitted)
    #[arg(value_name = "ITEM")]
    pub items: Vec<String>,

    /// Show the registry writes that would be made without making them
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

impl Command for RestoreCommand {
    /// Number of items replayed
    type Output = usize;

    fn execute(&self, context: &RuntimeContext) -> Result<usize> {
        let manifest = context.manifest()?;
        let live = context.registry()?;
        let runner = context.runner();

        println!("{}", "Prerequisites".bright_white().bold());
        let outcomes = PrerequisiteEngine::new(&live, &runner)
            .evaluate_report(&manifest.prerequisites, Operation::Restore)?;
        print_outcomes(&outcomes);

        let items = select_items(&manifest.registry, &self.items)?;
        let protector = context.protector_for(&manifest)?;

        let dry_run = DryRunRegistry::new(&live);
        let registry: &dyn RegistryAccessor = if self.dry_run { &dry_run } else { &live };

        let store = StateStore::new(context.state_root.clone(), &RealSystem);
        let mut engine = RegistryStateEngine::new(registry, store);
        if let Some(protector) = &protector {
            engine = engine.with_protector(protector);
        }

        println!();
        println!("{}", "Registry".bright_white().bold());

        let mut failed = 0;
        for item in &items {
            match engine.replay(item) {
                Ok(()) => {
                    print_item(&"✓".bright_green().to_string(), item, &item.to_string());
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!("Failed to restore '{}': {e}", item.name);
                    print_item(&"✗".bright_red().to_string(), item, &e.to_string());
                }
            }
        }

        if self.dry_run {
            println!();
            println!("{}", "Dry run, registry unchanged:".dimmed());
            for write in dry_run.writes() {
                match write {
                    RegistryWrite::SetValue { path, name, value } => {
                        println!("  set {path}\\{name} = {value}");
                    }
                    RegistryWrite::CreateKey { path } => println!("  create {path}"),
                }
            }
        }

        if failed > 0 {
            return Err(CommandError::ItemsFailed {
                operation: Operation::Restore,
                failed,
                total: items.len(),
            });
        }

        Ok(items.len())
    }
}
