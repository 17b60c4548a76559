// crates/iac-forge-validate/src/text.rs
// ============================================================================
// Module: Text Predicates
// Description: URL, SSH public key, and free-text description checks.
// Purpose: Validate user-supplied strings with well-known grammars.
// Dependencies: url
// ============================================================================

//! ## Overview
//! URL parsing uses the `url` crate and accepts only `http` and `https`.
//! SSH public keys are checked structurally: an algorithm prefix followed by
//! a base64 body, with an optional comment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Key algorithms accepted in an SSH public key.
const SSH_KEY_ALGORITHMS: [&str; 5] = [
    "ssh-rsa",
    "ssh-ed25519",
    "ecdsa-sha2-nistp256",
    "ecdsa-sha2-nistp384",
    "ecdsa-sha2-nistp521",
];
/// Minimum base64 body length of a plausible key.
const MIN_SSH_KEY_BODY: usize = 64;
/// Maximum description length.
const MAX_DESCRIPTION_LENGTH: usize = 128;

// ============================================================================
// SECTION: Predicates
// ============================================================================

/// Returns true when `value` is empty or parses as an http(s) URL.
#[must_use]
pub fn is_valid_url(value: &str) -> bool {
    if value.is_empty() {
        return true;
    }
    Url::parse(value)
        .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
}

/// Returns true when the value is not a structurally valid SSH public key.
#[must_use]
pub fn invalid_ssh_public_key(value: &str) -> bool {
    let mut parts = value.split_whitespace();
    let (Some(algorithm), Some(body)) = (parts.next(), parts.next()) else {
        return true;
    };
    !SSH_KEY_ALGORITHMS.contains(&algorithm)
        || body.len() < MIN_SSH_KEY_BODY
        || !body.trim_end_matches('=').bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'+' || byte == b'/')
}

/// Returns true when a non-empty description is malformed.
///
/// Descriptions start with a letter and contain letters, digits, whitespace,
/// `-`, `.`, `_` and `,`.
#[must_use]
pub fn invalid_description(value: Option<&str>) -> bool {
    let Some(value) = value.filter(|value| !value.is_empty()) else {
        return false;
    };
    let starts_with_letter = value.chars().next().is_some_and(|ch| ch.is_ascii_alphabetic());
    !starts_with_letter
        || value.len() > MAX_DESCRIPTION_LENGTH
        || !value.chars().all(|ch| {
            ch.is_ascii_alphanumeric() || ch.is_whitespace() || matches!(ch, '-' | '.' | '_' | ',')
        })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_BODY: &str = "AAAAB3NzaC1yc2thisisnotarealkeybutithasenoughbase64charactersinsideittopass1234567890";

    #[test]
    fn urls() {
        assert!(is_valid_url(""));
        assert!(is_valid_url("https://example.com/path"));
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url("not a url"));
    }

    #[test]
    fn ssh_keys() {
        assert!(!invalid_ssh_public_key(&format!("ssh-rsa {KEY_BODY}== user@host")));
        assert!(invalid_ssh_public_key("ssh-rsa short"));
        assert!(invalid_ssh_public_key(&format!("ssh-dss {KEY_BODY}")));
        assert!(invalid_ssh_public_key(""));
    }

    #[test]
    fn descriptions() {
        assert!(!invalid_description(None));
        assert!(!invalid_description(Some("")));
        assert!(!invalid_description(Some("Resolver for the hub, zone 1")));
        assert!(invalid_description(Some("@home")));
    }
}
