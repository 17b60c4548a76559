//! Validation predicate property-based tests.
//!
//! ## Purpose
//! These tests drive the predicates with randomized input to show they are
//! total (no panics on arbitrary strings) and agree with their documented
//! grammar on generated well-formed values.
//!
//! ## What is covered
//! - Generated kebab-case names pass the name rule; names with a foreign
//!   character fail it.
//! - Whole numbers inside a range pass; values outside fail.
//! - Generated dotted quads with prefixes pass the CIDR check.
// crates/iac-forge-validate/tests/proptest_predicates.rs
// ============================================================================
// Module: Validation Property-Based Tests
// Description: Randomized checks for name, number, and network predicates.
// Purpose: Ensure predicates are total and match their grammar.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    reason = "Test-only assertions and helpers are permitted."
)]

use iac_forge_validate::invalid_cidr_block;
use iac_forge_validate::invalid_description;
use iac_forge_validate::invalid_dns_zone_name_format;
use iac_forge_validate::invalid_name_format;
use iac_forge_validate::invalid_number;
use iac_forge_validate::invalid_ssh_public_key;
use iac_forge_validate::invalid_tag_list;
use iac_forge_validate::is_valid_url;
use proptest::prelude::*;
use serde_json::json;

proptest! {
    #[test]
    fn kebab_names_are_valid(name in "[a-z]([a-z0-9-]{0,40}[a-z0-9])?") {
        prop_assert!(!invalid_name_format(&name));
    }

    #[test]
    fn names_with_foreign_characters_are_invalid(
        head in "[a-z]{1,8}",
        bad in "[A-Z@_ .!]",
        tail in "[a-z]{1,8}",
    ) {
        let name = format!("{head}{bad}{tail}");
        prop_assert!(invalid_name_format(&name));
    }

    #[test]
    fn predicates_are_total(raw in ".{0,96}") {
        let _ = invalid_name_format(&raw);
        let _ = invalid_dns_zone_name_format(&raw);
        let _ = invalid_cidr_block(&raw);
        let _ = invalid_ssh_public_key(&raw);
        let _ = invalid_description(Some(&raw));
        let _ = is_valid_url(&raw);
        let _ = invalid_tag_list(&[raw.as_str()]);
        let _ = invalid_number(Some(&json!(raw)), 0, 10);
    }

    #[test]
    fn whole_numbers_in_range_are_valid(value in 1i64 ..= 112) {
        prop_assert!(!invalid_number(Some(&json!(value)), 1, 112));
        prop_assert!(!invalid_number(Some(&json!(value.to_string())), 1, 112));
    }

    #[test]
    fn numbers_outside_range_are_invalid(value in 113i64 .. 10_000) {
        prop_assert!(invalid_number(Some(&json!(value)), 1, 112));
        prop_assert!(invalid_number(Some(&json!(-value)), 1, 112));
    }

    #[test]
    fn generated_blocks_are_cidrs(a in 0u8 ..= 255, b in 0u8 ..= 255, c in 0u8 ..= 255, bits in 0u8 ..= 32) {
        let block = format!("{a}.{b}.{c}.0/{bits}");
        prop_assert!(!invalid_cidr_block(&block));
    }
}
