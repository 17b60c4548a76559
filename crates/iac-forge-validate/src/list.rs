// crates/iac-forge-validate/src/list.rs
// ============================================================================
// Module: List Predicates
// Description: Element-wise checks for tag lists, CRN lists, and IP lists.
// Purpose: Judge multi-value fields where any bad element fails the list.
// Dependencies: crate::network
// ============================================================================

//! ## Overview
//! A list is invalid when any element fails its per-element rule or when the
//! list breaks a count constraint. An absent or empty list is valid; callers
//! that require at least one entry check that separately.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::network::is_ipv4_cidr_or_address;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of a single tag.
const MAX_TAG_LENGTH: usize = 128;
/// Maximum number of tags attached to one resource.
const MAX_TAGS: usize = 100;
/// Number of colon-separated segments in a CRN.
const CRN_SEGMENTS: usize = 10;

// ============================================================================
// SECTION: Predicates
// ============================================================================

/// Returns true when any tag is malformed or the list is too long.
///
/// A tag starts with a letter, contains letters, digits, `-`, `_`, `.` or
/// `:`, and does not end with `-`.
#[must_use]
pub fn invalid_tag_list<S: AsRef<str>>(tags: &[S]) -> bool {
    tags.len() > MAX_TAGS || tags.iter().any(|tag| invalid_tag(tag.as_ref()))
}

/// Returns true when any entry is not a well-formed CRN.
#[must_use]
pub fn invalid_crn_list<S: AsRef<str>>(crns: &[S]) -> bool {
    crns.iter().any(|crn| {
        let crn = crn.as_ref();
        !crn.starts_with("crn:v1:") || crn.split(':').count() != CRN_SEGMENTS
    })
}

/// Returns true when a comma-separated list holds a bad address or block.
///
/// `None` and the empty string are valid.
#[must_use]
pub fn invalid_ip_comma_list(value: Option<&str>) -> bool {
    let Some(value) = value.filter(|value| !value.is_empty()) else {
        return false;
    };
    value.split(',').any(|entry| !is_ipv4_cidr_or_address(entry.trim()))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Checks one tag.
fn invalid_tag(tag: &str) -> bool {
    let starts_with_letter = tag.chars().next().is_some_and(|ch| ch.is_ascii_alphabetic());
    !starts_with_letter
        || tag.len() > MAX_TAG_LENGTH
        || tag.ends_with('-')
        || !tag.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | ':'))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
