//! # Keepstate Crypto
//!
//! Age-backed encoding primitive for encrypted state values.
//!
//! [`AgeProtector`] implements [`keepstate_core::Protector`]: it turns
//! arbitrary bytes into an `age:<base64>` token and back.

pub mod identity;
pub mod protect;

pub use identity::{Identity, load_identities, save_identities};
pub use protect::{PROTECTED_PREFIX, protect, unprotect};

/// Public key that values are encrypted to
pub use age::x25519::Recipient;

use age::x25519;
use thiserror::Error;

/// Age encryption provider implementing the `Protector` trait
pub struct AgeProtector {
    recipients: Vec<x25519::Recipient>,
    identities: Vec<Identity>,
}

impl AgeProtector {
    /// Create a protector able to both encrypt and decrypt
    #[must_use]
    pub fn new(recipients: Vec<x25519::Recipient>, identities: Vec<Identity>) -> Self {
        Self {
            recipients,
            identities,
        }
    }

    /// Create a protector from identities, encrypting to their own public keys
    #[must_use]
    pub fn from_identities(identities: Vec<Identity>) -> Self {
        let recipients = identities.iter().map(Identity::to_public).collect();
        Self::new(recipients, identities)
    }
}

impl keepstate_core::Protector for AgeProtector {
    fn protect(&self, data: &[u8]) -> keepstate_core::Result<String> {
        protect(data, &self.recipients).map_err(|e| keepstate_core::Error::Protect(e.to_string()))
    }

    fn unprotect(&self, encoded: &str) -> keepstate_core::Result<Vec<u8>> {
        unprotect(encoded, &self.identities)
            .map_err(|e| keepstate_core::Error::Protect(e.to_string()))
    }
}

/// Result type for crypto operations
pub type Result<T> = std::result::Result<T, Error>;

/// Crypto-related errors
#[derive(Error, Debug)]
pub enum Error {
    /// Age encryption/decryption error
    #[error("Age encryption error: {0}")]
    Age(String),

    /// No recipients provided for encryption
    #[error(
        "No recipients provided for encryption\n\
         \n\
         To fix this:\n\
         1. Generate an identity:       keepstate age generate\n\
         2. Or point the config at one: [age] identity = \"~/.config/keepstate/key.txt\""
    )]
    NoRecipients,

    /// Identity file not found
    #[error(
        "Identity file not found: {path}\n\
         \n\
         To fix this:\n\
         1. Generate a new identity:    keepstate age generate\n\
         2. Or check the file path:     ls {path}"
    )]
    IdentityNotFound {
        /// Path to the identity file that was not found
        path: String,
    },

    /// Identity file IO error (read/write failures)
    #[error("Failed to {operation} identity file {path}: {source}")]
    IdentityFile {
        /// Operation that failed (read/write)
        operation: String,
        /// Path to the identity file
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Invalid identity format or content
    #[error("Invalid identity in {path}: {reason}\nExpected format: AGE-SECRET-KEY-1...")]
    InvalidIdentity {
        /// Reason for the invalid identity
        reason: String,
        /// Path to the identity file
        path: String,
    },

    /// Decryption failed due to wrong key
    #[error("Decryption failed - wrong key or corrupted data")]
    WrongKey,

    /// Decryption failed for other reasons
    #[error("Decryption failed: {reason}")]
    DecryptionFailed {
        /// Reason for decryption failure
        reason: String,
    },

    /// No identity available for decryption
    #[error(
        "No identity available for decryption\n\
         \n\
         To fix this:\n\
         1. Generate a new identity:  keepstate age generate\n\
         2. Or configure an existing identity in ~/.config/keepstate/config.toml:\n\
         \n\
         [age]\n\
         identity = \"~/.config/keepstate/key.txt\""
    )]
    NoIdentity,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
