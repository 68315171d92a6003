//! Compact protect/unprotect for state values
//!
//! Values are encrypted to binary age format and rendered as
//! `age:<base64>`, which embeds cleanly in a JSON state file.

use crate::identity::Identity;
use crate::{Error, Result};
use age::x25519;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::io::{Read, Write};

/// Prefix for protected values: "age:"
pub const PROTECTED_PREFIX: &str = "age:";

#[inline]
fn age_error<E: std::fmt::Display>(e: E) -> Error {
    Error::Age(e.to_string())
}

#[inline]
fn map_decrypt_error(e: age::DecryptError) -> Error {
    match e {
        age::DecryptError::NoMatchingKeys
        | age::DecryptError::InvalidMac
        | age::DecryptError::KeyDecryptionFailed => Error::WrongKey,
        age::DecryptError::Io(io_err) => Error::Io(io_err),
        other => Error::DecryptionFailed {
            reason: other.to_string(),
        },
    }
}

/// Encrypt bytes for the given recipients as `age:<base64>`
///
/// # Errors
///
/// - [`Error::NoRecipients`] if `recipients` is empty
/// - [`Error::Age`] if encryption fails
///
/// # Examples
///
/// ```no_run
/// use keepstate_crypto::{Identity, protect, unprotect};
///
/// let identity = Identity::generate();
/// let token = protect(b"OriginalData", &[identity.to_public()]).unwrap();
/// assert!(token.starts_with("age:"));
/// assert_eq!(unprotect(&token, &[identity]).unwrap(), b"OriginalData");
/// ```
pub fn protect(data: &[u8], recipients: &[x25519::Recipient]) -> Result<String> {
    if recipients.is_empty() {
        return Err(Error::NoRecipients);
    }

    let recipient_refs = recipients.iter().map(|r| r as &dyn age::Recipient);
    let encryptor = age::Encryptor::with_recipients(recipient_refs)
        .map_err(|_| Error::Age("Failed to create encryptor with recipients".to_string()))?;

    let mut encrypted = Vec::new();
    let mut writer = encryptor.wrap_output(&mut encrypted).map_err(age_error)?;
    writer.write_all(data).map_err(age_error)?;
    writer.finish().map_err(age_error)?;

    Ok(format!("{PROTECTED_PREFIX}{}", STANDARD.encode(&encrypted)))
}

/// Decrypt an `age:<base64>` token produced by [`protect`]
///
/// # Errors
///
/// - [`Error::NoIdentity`] if `identities` is empty
/// - [`Error::DecryptionFailed`] if the prefix or base64 payload is malformed
/// - [`Error::WrongKey`] if no identity matches
pub fn unprotect(token: &str, identities: &[Identity]) -> Result<Vec<u8>> {
    if identities.is_empty() {
        return Err(Error::NoIdentity);
    }

    let payload = token
        .trim()
        .strip_prefix(PROTECTED_PREFIX)
        .ok_or_else(|| Error::DecryptionFailed {
            reason: format!("Invalid protected value: expected '{PROTECTED_PREFIX}' prefix"),
        })?;

    let encrypted = STANDARD
        .decode(payload)
        .map_err(|e| Error::DecryptionFailed {
            reason: format!("Invalid base64 encoding: {e}"),
        })?;

    let decryptor = age::Decryptor::new(&encrypted[..]).map_err(map_decrypt_error)?;
    let age_identities = identities.iter().map(|i| i.as_age() as &dyn age::Identity);
    let mut reader = decryptor
        .decrypt(age_identities)
        .map_err(map_decrypt_error)?;

    let mut decrypted = Vec::new();
    reader.read_to_end(&mut decrypted).map_err(age_error)?;
    Ok(decrypted)
}
