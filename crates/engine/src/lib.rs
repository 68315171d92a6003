//! # Keepstate Engine
//!
//! Capture and replay of registry state, and the prerequisite gate in front
//! of both.
//!
//! - **Registry access**: [`registry::RegistryAccessor`] with in-memory,
//!   JSON-file and dry-run backends
//! - **State Store**: JSON records under a state-files root
//! - **Registry State Engine**: capture/replay of one item at a time
//! - **Prerequisite Engine**: application, registry and script checks with
//!   per-check failure policies
//! - **System Abstraction**: filesystem operations, real or dry-run
//! - **Process Runner**: subprocess execution for checks
//! - **Manifest**: TOML list of prerequisites and registry items

pub mod error;
pub mod manifest;
pub mod prereq;
pub mod process;
pub mod registry;
pub mod state;
pub mod store;
pub mod system;

// Re-export path types from core
pub use keepstate_core::path::{AbsPath, RelPath};

pub use error::{Error, Result};

// Re-export commonly used types
pub use manifest::Manifest;
pub use prereq::{
    CheckStatus, OnMissing, Operation, Prerequisite, PrerequisiteCheck, PrerequisiteEngine,
    PrerequisiteOutcome,
};
pub use process::{ProcessOutput, ProcessRunner, ShellRunner};
pub use registry::{RegistryAccessor, RegistryValue, ValueKind};
pub use state::{CapturedData, CapturedRegistryState, ItemMode, RegistryItem, RegistryStateEngine};
pub use store::StateStore;
pub use system::{DryRunSystem, RealSystem, System};
