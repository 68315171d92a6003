//! Check command implementation
//!
//! Runs the manifest's prerequisites for an operation without touching the
//! registry or any state file.

use clap::{Args, ValueEnum};
use keepstate_engine::{CheckStatus, Operation, PrerequisiteEngine, PrerequisiteOutcome};
use owo_colors::OwoColorize;

use crate::cmd::print_outcomes;
use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::Result;

/// Operation to evaluate prerequisites for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OperationArg {
    /// Failure policies as applied to a backup
    #[default]
    Backup,
    /// Failure policies as applied to a restore
    Restore,
}

impl From<OperationArg> for Operation {
    fn from(arg: OperationArg) -> Self {
        match arg {
            OperationArg::Backup => Operation::Backup,
            OperationArg::Restore => Operation::Restore,
        }
    }
}

/// Evaluate prerequisites
#[derive(Debug, Default, Args)]
pub struct CheckCommand {
    /// Operation whose failure policies apply
    #[arg(short, long, value_enum, default_value_t = OperationArg::Backup)]
    pub operation: OperationArg,
}

impl Command for CheckCommand {
    type Output = Vec<PrerequisiteOutcome>;

    fn execute(&self, context: &RuntimeContext) -> Result<Vec<PrerequisiteOutcome>> {
        let manifest = context.manifest()?;
        let registry = context.registry()?;
        let runner = context.runner();
        let operation = Operation::from(self.operation);

        println!(
            "{} {}",
            "Prerequisites for".bright_white().bold(),
            operation.to_string().bright_white().bold()
        );

        if manifest.prerequisites.is_empty() {
            println!("  {}", "No prerequisites defined".dimmed());
            return Ok(Vec::new());
        }

        let outcomes = PrerequisiteEngine::new(&registry, &runner)
            .evaluate_report(&manifest.prerequisites, operation)?;
        print_outcomes(&outcomes);

        let warned = outcomes
            .iter()
            .filter(|o| o.status == CheckStatus::Warned)
            .count();
        if warned == 0 {
            println!("\n{}", "All prerequisites passed".bright_green());
        } else {
            println!(
                "\n{}",
                format!("{warned} prerequisite(s) failed with a non-fatal policy").yellow()
            );
        }

        Ok(outcomes)
    }
}
