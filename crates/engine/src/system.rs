//! System abstraction for filesystem operations
//!
//! The State Store goes through this trait so a backup or restore can run
//! against the real filesystem or in dry-run mode.

use crate::error::{Error, Result};
use keepstate_core::path::AbsPath;
use std::cell::RefCell;
use std::fs;

/// Abstraction over the filesystem operations the State Store needs
pub trait System {
    /// Read a file's contents
    fn read_file(&self, path: &AbsPath) -> Result<Vec<u8>>;

    /// Write a file's contents, creating parent directories as needed
    fn write_file(&self, path: &AbsPath, content: &[u8]) -> Result<()>;

    /// Create a directory and all of its parents
    fn create_dir_all(&self, path: &AbsPath) -> Result<()>;

    /// Check if a path exists
    fn exists(&self, path: &AbsPath) -> bool;
}

/// Real filesystem implementation
pub struct RealSystem;

impl System for RealSystem {
    fn read_file(&self, path: &AbsPath) -> Result<Vec<u8>> {
        fs::read(path.as_path()).map_err(|e| Error::FileRead {
            path: path.clone(),
            source: e,
        })
    }

    fn write_file(&self, path: &AbsPath, content: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            self.create_dir_all(&parent)?;
        }

        fs::write(path.as_path(), content).map_err(|e| Error::FileWrite {
            path: path.clone(),
            source: e,
        })
    }

    fn create_dir_all(&self, path: &AbsPath) -> Result<()> {
        fs::create_dir_all(path.as_path()).map_err(|e| Error::DirectoryCreate {
            path: path.clone(),
            source: e,
        })
    }

    fn exists(&self, path: &AbsPath) -> bool {
        path.as_path().exists()
    }
}

/// Dry-run system: reads from disk, records writes without performing them
#[derive(Debug, Default)]
pub struct DryRunSystem {
    operations: RefCell<Vec<Operation>>,
}

/// A filesystem write that would have been performed
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Write a file
    WriteFile { path: AbsPath, size: usize },
    /// Create a directory
    CreateDir { path: AbsPath },
}

impl DryRunSystem {
    /// Create a new dry-run system
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations that would have been performed, in order
    pub fn operations(&self) -> Vec<Operation> {
        self.operations.borrow().clone()
    }

    fn record(&self, op: Operation) {
        self.operations.borrow_mut().push(op);
    }
}

impl System for DryRunSystem {
    fn read_file(&self, path: &AbsPath) -> Result<Vec<u8>> {
        RealSystem.read_file(path)
    }

    fn write_file(&self, path: &AbsPath, content: &[u8]) -> Result<()> {
        self.record(Operation::WriteFile {
            path: path.clone(),
            size: content.len(),
        });
        Ok(())
    }

    fn create_dir_all(&self, path: &AbsPath) -> Result<()> {
        self.record(Operation::CreateDir { path: path.clone() });
        Ok(())
    }

    fn exists(&self, path: &AbsPath) -> bool {
        RealSystem.exists(path)
    }
}
