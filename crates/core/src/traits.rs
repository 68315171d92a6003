//! Capability traits shared across keepstate crates
//!
//! Engines depend on these interfaces instead of concrete backends so the
//! encryption primitive can be swapped (or faked in tests) without touching
//! capture/replay logic.

use crate::Result;

/// Encoding primitive used for encrypted state values
///
/// Contract: `unprotect(&protect(b)?)? == b` for every byte sequence `b`.
/// The encoded form is plain text so it can be embedded in a JSON state file.
///
/// # Examples
///
/// ```ignore
/// fn seal(protector: &dyn Protector, secret: &str) -> Result<String> {
///     protector.protect(secret.as_bytes())
/// }
/// ```
pub trait Protector {
    /// Encode bytes into a text token
    fn protect(&self, data: &[u8]) -> Result<String>;

    /// Decode a text token produced by [`Protector::protect`]
    fn unprotect(&self, encoded: &str) -> Result<Vec<u8>>;
}

impl<P: Protector + ?Sized> Protector for &P {
    fn protect(&self, data: &[u8]) -> Result<String> {
        (**self).protect(data)
    }

    fn unprotect(&self, encoded: &str) -> Result<Vec<u8>> {
        (**self).unprotect(encoded)
    }
}
