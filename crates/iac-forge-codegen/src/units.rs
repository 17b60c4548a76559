// crates/iac-forge-codegen/src/units.rs
// ============================================================================
// Module: Unit Normalization
// Description: Converts human-readable sizes into provider parameter values.
// Purpose: Keep event streams throughput and storage parsing in one place.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Event streams throughput is stored as `"150MB/s"` and storage as `"2TB"`;
//! the provider expects bare megabytes-per-second and gigabytes.

/// Strips the `MB/s` unit from a throughput value.
#[must_use]
pub fn throughput(value: &str) -> String {
    value.trim().trim_end_matches("MB/s").trim().to_string()
}

/// Converts a storage size into gigabytes (`GB` ×1, `TB` ×1024).
///
/// Values without a recognized unit are returned unchanged.
#[must_use]
pub fn storage_gb(value: &str) -> String {
    let value = value.trim();
    let (digits, multiplier) = if let Some(digits) = value.strip_suffix("TB") {
        (digits, 1024)
    } else if let Some(digits) = value.strip_suffix("GB") {
        (digits, 1)
    } else {
        return value.to_string();
    };
    digits
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|amount| amount.checked_mul(multiplier))
        .map_or_else(|| value.to_string(), |amount| amount.to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
