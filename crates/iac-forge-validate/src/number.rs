// crates/iac-forge-validate/src/number.rs
// ============================================================================
// Module: Numeric Predicates
// Description: Emptiness, whole-number, and inclusive range checks.
// Purpose: Judge numeric form input that may arrive as a number or a string.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Form input for numeric fields arrives either as a JSON number or as the
//! raw text typed by the user. Both shapes are accepted; anything else is not
//! a number. Empty input is never invalid here; required-field checks are a
//! separate concern.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

// ============================================================================
// SECTION: Predicates
// ============================================================================

/// Returns true when the value is missing, null, or an empty string.
#[must_use]
pub fn is_null_or_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        Some(_) => false,
    }
}

/// Extracts a numeric value from a JSON number or numeric string.
#[must_use]
pub fn number_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|parsed| parsed.is_finite()),
        _ => None,
    }
}

/// Returns true when the value is a number with no fractional part.
#[must_use]
pub fn is_whole_number(value: &Value) -> bool {
    number_value(value).is_some_and(|number| number.fract() == 0.0)
}

/// Returns true when a non-empty value is not a whole number in `[min, max]`.
#[must_use]
pub fn invalid_number(value: Option<&Value>, min: i64, max: i64) -> bool {
    let Some(value) = value.filter(|value| !is_null_or_empty(Some(value))) else {
        return false;
    };
    if !is_whole_number(value) {
        return true;
    }
    number_value(value).is_none_or(|number| !in_range(number, min, max))
}

/// Builds helper text for a numeric field outside its range.
#[must_use]
pub fn invalid_number_text(min: i64, max: i64) -> String {
    format!("Must be a whole number between {min} and {max}")
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Inclusive range check performed in floating point.
#[allow(clippy::cast_precision_loss, reason = "Range bounds are small form limits.")]
fn in_range(number: f64, min: i64, max: i64) -> bool {
    number >= min as f64 && number <= max as f64
}

// ============================================================================
// SECTION: Tests
// ============================================================================
