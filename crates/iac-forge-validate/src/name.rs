// crates/iac-forge-validate/src/name.rs
// ============================================================================
// Module: Name Predicates
// Description: Character-class, length, and duplicate checks for record names.
// Purpose: Back the `name` field rule shared by every resource type.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Resource names start with a lowercase letter, use only lowercase letters,
//! digits and hyphens, and never end with a hyphen. DNS zone names are a
//! dot-separated list of hostname labels without a trailing dot.
//!
//! # Invariants
//! - Empty names are always invalid.
//! - Duplicate detection ignores the record currently being edited.

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of a resource name.
pub const MAX_NAME_LENGTH: usize = 63;

/// Pattern reported to users when a name fails the character-class rule.
const NAME_PATTERN: &str = "^[a-z]([a-z0-9-]*[a-z0-9])?$";

// ============================================================================
// SECTION: Predicates
// ============================================================================

/// Returns true when `name` fails the resource name rule.
#[must_use]
pub fn invalid_name_format(name: &str) -> bool {
    !is_label(name, false) || name.len() > MAX_NAME_LENGTH
}

/// Returns true when `name` is not a valid DNS zone name.
///
/// Labels may contain uppercase letters and may start with a digit, the way
/// hostnames do. A trailing period is rejected.
#[must_use]
pub fn invalid_dns_zone_name_format(name: &str) -> bool {
    if name.is_empty() || name.len() > 253 || name.ends_with('.') {
        return true;
    }
    name.split('.').any(|label| !is_label(label, true) || label.len() > MAX_NAME_LENGTH)
}

/// Returns true when `name` collides with a sibling other than `editing`.
///
/// `editing` is the stored name of the record being edited, or `None` when a
/// new record is being composed.
#[must_use]
pub fn has_duplicate_name<'a, I>(siblings: I, name: &str, editing: Option<&str>) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    if editing == Some(name) {
        return false;
    }
    siblings.into_iter().any(|sibling| sibling == name)
}

/// Builds helper text for a name that failed validation.
#[must_use]
pub fn invalid_name_text(name: &str, duplicate: bool) -> String {
    if duplicate {
        format!("Name \"{name}\" already in use")
    } else if name.len() > MAX_NAME_LENGTH {
        format!("Name must be {MAX_NAME_LENGTH} characters or fewer")
    } else {
        format!("Name must follow the regex pattern: {NAME_PATTERN}")
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Checks a single label. `hostname` relaxes case and leading-digit rules.
fn is_label(label: &str, hostname: bool) -> bool {
    let bytes = label.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };
    let first_ok = if hostname {
        first.is_ascii_alphanumeric()
    } else {
        first.is_ascii_lowercase()
    };
    if !first_ok || *last == b'-' {
        return false;
    }
    bytes.iter().all(|byte| {
        *byte == b'-'
            || byte.is_ascii_digit()
            || if hostname { byte.is_ascii_alphabetic() } else { byte.is_ascii_lowercase() }
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
