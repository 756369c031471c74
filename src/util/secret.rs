//! Secret string type for credential handling.
//!
//! Keeps configured passwords out of debug output, logs, and error messages.

use serde::Deserialize;
use std::fmt;

/// A password or other credential that must not be logged.
///
/// - `Debug` and `Display` render `[REDACTED]`
/// - [`SecretString::verify`] compares without exposing the value
/// - [`SecretString::expose_secret`] is the only way to read it back
///
/// # Example
/// ```ignore
/// let password = SecretString::new("picketlink");
/// println!("{:?}", password);  // [REDACTED]
/// assert!(password.verify("picketlink"));
/// ```
#[derive(Clone, Default)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Read the raw value. Avoid outside of credential checks.
    #[inline]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// Compare against a candidate in time independent of where they differ.
    pub fn verify(&self, candidate: &str) -> bool {
        let expected = self.0.as_bytes();
        let given = candidate.as_bytes();

        let mut diff = expected.len() ^ given.len();
        for (i, byte) in given.iter().enumerate() {
            let other = expected.get(i).copied().unwrap_or(0);
            diff |= usize::from(byte ^ other);
        }
        diff == 0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        // Best effort only; copies may exist elsewhere
        self.0.clear();
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretString::new)
    }
}
