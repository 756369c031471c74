//! Utility functions shared across the application.

mod secret;

pub use secret::SecretString;

use rand::Rng;
use std::fmt::Write;

/// Generate a random 128-bit identifier rendered as lowercase hex.
///
/// Used for role, user and session identifiers.
pub fn random_id() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);

    bytes.iter().fold(String::with_capacity(32), |mut out, b| {
        let _ = write!(out, "{:02x}", b);
        out
    })
}

/// Find a cookie value in a `Cookie` header.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_id_format() {
        let id = random_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, random_id());
    }

    #[test]
    fn test_cookie_value() {
        let header = "theme=dark; ROLEGUARD_SESSION=abc123; other=1";
        assert_eq!(cookie_value(header, "ROLEGUARD_SESSION"), Some("abc123"));
        assert_eq!(cookie_value(header, "missing"), None);
    }
}
