//! Configuration management for keepstate
//!
//! This crate handles:
//! - Configuration loading and saving
//! - XDG directory management
//! - Choosing between machine-specific and shared backup directories
//! - Logging initialization

pub mod config;
pub mod dirs;
pub mod logging;

// Re-export error types from core
pub use keepstate_core::{Error, Result};

// Re-export main types
pub use config::{AgeConfig, Config, GeneralConfig};
pub use dirs::{
    config_dir, data_dir, default_config_file, default_manifest_file, resolve_state_root,
};
