// crates/iac-forge-validate/src/lib.rs
// ============================================================================
// Module: Validation Library Root
// Description: Public API surface for iac-forge field predicates.
// Purpose: Re-export name, number, network, list, and text predicates.
// Dependencies: crate::{list, name, network, number, text}
// ============================================================================

//! ## Overview
//! Stateless predicates that judge a candidate value against a domain rule.
//! Every predicate answers "is this invalid" (or "is this empty") so callers
//! can compose them with `||` into save-gating decisions. None of them
//! allocate state or fail; malformed input is simply invalid.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod list;
pub mod name;
pub mod network;
pub mod number;
pub mod text;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use list::invalid_crn_list;
pub use list::invalid_ip_comma_list;
pub use list::invalid_tag_list;
pub use name::MAX_NAME_LENGTH;
pub use name::has_duplicate_name;
pub use name::invalid_dns_zone_name_format;
pub use name::invalid_name_format;
pub use name::invalid_name_text;
pub use network::PortField;
pub use network::invalid_cidr_block;
pub use network::is_ipv4_address;
pub use network::is_ipv4_cidr_or_address;
pub use network::valid_port_range;
pub use number::invalid_number;
pub use number::invalid_number_text;
pub use number::is_null_or_empty;
pub use number::is_whole_number;
pub use number::number_value;
pub use text::invalid_description;
pub use text::invalid_ssh_public_key;
pub use text::is_valid_url;
