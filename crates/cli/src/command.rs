//! Command trait for the keepstate CLI
//!
//! Commands that operate on a manifest implement [`Command`] and receive a
//! [`RuntimeContext`] holding the loaded configuration and resolved paths.

use crate::common::RuntimeContext;
use crate::error::Result;

/// Trait for manifest-driven commands
///
/// # Example
///
/// ```rust,ignore
/// use crate::command::Command;
/// use crate::common::RuntimeContext;
/// use crate::error::Result;
/// use clap::Args;
///
/// #[derive(Debug, Args)]
/// pub struct MyCommand {
///     #[arg(short = 'n', long)]
///     pub dry_run: bool,
/// }
///
/// impl Command for MyCommand {
///     type Output = ();
///
///     fn execute(&self, context: &RuntimeContext) -> Result<()> {
///         let manifest = context.manifest()?;
///         Ok(())
///     }
/// }
/// ```
pub trait Command {
    /// The type returned by this command
    type Output;

    /// Execute the command with the given runtime context
    ///
    /// # Errors
    ///
    /// Returns a `CommandError` if the command fails to execute.
    fn execute(&self, context: &RuntimeContext) -> Result<Self::Output>;
}
