// crates/iac-forge-codegen/src/naming.rs
// ============================================================================
// Module: Naming Helpers
// Description: Case conversions for Terraform addresses and section titles.
// Purpose: Derive every generated identifier from record names in one place.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Record names are kebab-case user input. Terraform addresses need
//! `snake_case`, resource names need `kebab-case`, and section titles are
//! title-cased with a fixed acronym table.

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Words rendered in upper case inside titles.
const ACRONYMS: [&str; 9] = ["IAM", "VPC", "VPE", "SSH", "VSI", "VPN", "DNS", "F5", "IBM"];

// ============================================================================
// SECTION: Conversions
// ============================================================================

/// Lower-cases `value` and replaces every run of other characters with `_`.
///
/// ```
/// assert_eq!(iac_forge_codegen::naming::snake_case("slz-service rg"), "slz_service_rg");
/// ```
#[must_use]
pub fn snake_case(value: &str) -> String {
    separated(value, '_')
}

/// Lower-cases `value` and replaces every run of other characters with `-`.
#[must_use]
pub fn kebab_case(value: &str) -> String {
    separated(value, '-')
}

fn separated(value: &str, separator: char) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending = false;
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending && !out.is_empty() {
                out.push(separator);
            }
            pending = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending = true;
        }
    }
    out
}

/// Title-cases words split on `-`, `_`, and spaces.
///
/// Acronyms from the fixed table are upper-cased and `and` stays lower case.
#[must_use]
pub fn title_case(value: &str) -> String {
    value
        .split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .map(title_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_word(word: &str) -> String {
    if word.eq_ignore_ascii_case("and") {
        return "and".to_string();
    }
    if let Some(acronym) = ACRONYMS.iter().find(|acronym| acronym.eq_ignore_ascii_case(word)) {
        return (*acronym).to_string();
    }
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
