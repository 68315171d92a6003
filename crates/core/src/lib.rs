//! Core types and utilities for keepstate
//!
//! This is the foundation crate that all other keepstate crates depend on.
//! It provides:
//! - Path types (`AbsPath`, `RelPath`)
//! - Base error types
//! - Platform detection
//! - Capability traits (`Protector`)
//!
//! This crate has no dependencies on other keepstate crates.

pub mod error;
pub mod path;
pub mod platform;
pub mod traits;

pub use error::{Error, Result};
pub use traits::Protector;
