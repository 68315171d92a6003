//! Backup command implementation
//!
//! Evaluates the manifest's prerequisites, then captures every selected
//! registry item into the state-files root.

use clap::Args;
use keepstate_engine::{
    DryRunSystem, Operation, PrerequisiteEngine, RealSystem, RegistryStateEngine, StateStore,
    System,
};
use owo_colors::OwoColorize;

use crate::cmd::{print_item, print_outcomes, select_items};
use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::{CommandError, Result};

/// Counts from a finished backup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackupSummary {
    /// Items written to a state file
    pub captured: usize,
    /// Items whose key or value was missing
    pub skipped: usize,
}

/// Capture registry state into state files
#[derive(Debug, Default, Args)]
pub struct BackupCommand {
    /// Item names to back up (all items if omitted)
    #[arg(value_name = "ITEM")]
    pub items: Vec<String>,

    /// Show the state files that would be written without writing them
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

impl Command for BackupCommand {
    type Output = BackupSummary;

    fn execute(&self, context: &RuntimeContext) -> Result<BackupSummary> {
        let manifest = context.manifest()?;
        let registry = context.registry()?;
        let runner = context.runner();

        println!("{}", "Prerequisites".bright_white().bold());
        let outcomes = PrerequisiteEngine::new(&registry, &runner)
            .evaluate_report(&manifest.prerequisites, Operation::Backup)?;
        print_outcomes(&outcomes);

        let items = select_items(&manifest.registry, &self.items)?;
        let protector = context.protector_for(&manifest)?;

        let dry_run_system = DryRunSystem::new();
        let system: &dyn System = if self.dry_run {
            &dry_run_system
        } else {
            &RealSystem
        };

        let store = StateStore::new(context.state_root.clone(), system);
        let mut engine = RegistryStateEngine::new(&registry, store);
        if let Some(protector) = &protector {
            engine = engine.with_protector(protector);
        }

        println!();
        println!("{}", "Registry".bright_white().bold());

        let mut summary = BackupSummary::default();
        let mut failed = 0;
        for item in &items {
            match engine.capture(item) {
                Ok(Some(_)) => {
                    summary.captured += 1;
                    let path = engine.store().path_for(&item.dynamic_state_path);
                    print_item(&"✓".bright_green().to_string(), item, &path.to_string());
                }
                Ok(None) => {
                    summary.skipped += 1;
                    print_item(&"-".yellow().to_string(), item, "not present, skipped");
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!("Failed to back up '{}': {e}", item.name);
                    print_item(&"✗".bright_red().to_string(), item, &e.to_string());
                }
            }
        }

        if self.dry_run {
            println!();
            println!("{}", "Dry run, nothing written:".dimmed());
            for op in dry_run_system.operations() {
                println!("  {op:?}");
            }
        }

        if failed > 0 {
            return Err(CommandError::ItemsFailed {
                operation: Operation::Backup,
                failed,
                total: items.len(),
            });
        }

        Ok(summary)
    }
}
