//! Identity management for age encryption
//!
//! An identity file holds one or more `AGE-SECRET-KEY-1...` lines; blank
//! lines and `#` comments are ignored.

use crate::{Error, Result};
use age::x25519;
use secrecy::ExposeSecret;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

/// An age identity (private key)
#[derive(Clone)]
pub struct Identity(x25519::Identity);

impl Identity {
    /// Generate a new random age identity
    pub fn generate() -> Self {
        Self(x25519::Identity::generate())
    }

    /// Public key (recipient) for this identity
    pub fn to_public(&self) -> x25519::Recipient {
        self.0.to_public()
    }

    pub(crate) fn as_age(&self) -> &x25519::Identity {
        &self.0
    }
}

impl FromStr for Identity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<x25519::Identity>()
            .map(Self)
            .map_err(|e| Error::InvalidIdentity {
                reason: e.to_string(),
                path: "<string>".to_string(),
            })
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_string().expose_secret())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.to_public())
    }
}

/// Load every identity in an identity file
///
/// Lines that fail to parse are skipped with a warning; a file with no
/// valid identity at all is an error.
pub fn load_identities(path: &Path) -> Result<Vec<Identity>> {
    let path_str = path.display().to_string();

    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::IdentityNotFound {
                path: path_str.clone(),
            }
        } else {
            Error::IdentityFile {
                operation: "read".to_string(),
                path: path_str.clone(),
                source: e,
            }
        }
    })?;

    let mut identities = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match Identity::from_str(line) {
            Ok(identity) => identities.push(identity),
            Err(e) => warn!(
                "Skipping invalid identity on line {} in {}: {}",
                index + 1,
                path_str,
                e
            ),
        }
    }

    if identities.is_empty() {
        return Err(Error::InvalidIdentity {
            reason: "No valid identities found in file".to_string(),
            path: path_str,
        });
    }

    Ok(identities)
}

/// Write identities to a file, with each public key as a comment
///
/// On Unix the file is created with mode 0600.
pub fn save_identities(path: &Path, identities: &[Identity]) -> Result<()> {
    use std::io::Write;

    let path_str = path.display().to_string();
    let io_error = |source| Error::IdentityFile {
        operation: "write".to_string(),
        path: path_str.clone(),
        source,
    };

    let mut content = String::new();
    for identity in identities {
        content.push_str(&format!("# public key: {}\n", identity.to_public()));
        content.push_str(&identity.to_string());
        content.push('\n');
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(io_error)?;
    file.write_all(content.as_bytes()).map_err(io_error)?;
    Ok(())
}
