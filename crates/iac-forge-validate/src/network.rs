// crates/iac-forge-validate/src/network.rs
// ============================================================================
// Module: Network Predicates
// Description: IPv4 address, CIDR block, and port range checks.
// Purpose: Validate network fields on subnets, rules, and allow-lists.
// Dependencies: std::net
// ============================================================================

//! ## Overview
//! Address parsing is delegated to [`std::net::Ipv4Addr`]; prefixes must be
//! in `0..=32`. Port ranges depend on which field is being checked: ICMP
//! type and code have their own bounds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::Ipv4Addr;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Port-like fields on network rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortField {
    /// Destination port lower bound.
    PortMin,
    /// Destination port upper bound.
    PortMax,
    /// Source port lower bound.
    SourcePortMin,
    /// Source port upper bound.
    SourcePortMax,
    /// ICMP type.
    IcmpType,
    /// ICMP code.
    IcmpCode,
}

impl PortField {
    /// Returns the inclusive bounds for the field.
    #[must_use]
    pub const fn bounds(self) -> (i64, i64) {
        match self {
            Self::PortMin | Self::PortMax | Self::SourcePortMin | Self::SourcePortMax => (1, 65_535),
            Self::IcmpType => (0, 254),
            Self::IcmpCode => (0, 255),
        }
    }

    /// Returns the record field name for this port field.
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::PortMin => "port_min",
            Self::PortMax => "port_max",
            Self::SourcePortMin => "source_port_min",
            Self::SourcePortMax => "source_port_max",
            Self::IcmpType => "type",
            Self::IcmpCode => "code",
        }
    }
}

// ============================================================================
// SECTION: Predicates
// ============================================================================

/// Returns true for a dotted-quad IPv4 address.
#[must_use]
pub fn is_ipv4_address(value: &str) -> bool {
    value.parse::<Ipv4Addr>().is_ok()
}

/// Returns true for an IPv4 address or an IPv4 CIDR block.
#[must_use]
pub fn is_ipv4_cidr_or_address(value: &str) -> bool {
    match value.split_once('/') {
        None => is_ipv4_address(value),
        Some((address, prefix)) => {
            is_ipv4_address(address)
                && !prefix.is_empty()
                && prefix.bytes().all(|byte| byte.is_ascii_digit())
                && prefix.parse::<u8>().is_ok_and(|bits| bits <= 32)
        }
    }
}

/// Returns true when the value is not a CIDR block (a bare address is invalid).
#[must_use]
pub fn invalid_cidr_block(value: &str) -> bool {
    !value.contains('/') || !is_ipv4_cidr_or_address(value)
}

/// Returns true when `value` is inside the bounds of `field`.
#[must_use]
pub fn valid_port_range(field: PortField, value: i64) -> bool {
    let (min, max) = field.bounds();
    (min ..= max).contains(&value)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_and_blocks() {
        assert!(is_ipv4_cidr_or_address("10.0.0.1"));
        assert!(is_ipv4_cidr_or_address("10.0.0.0/24"));
        assert!(!is_ipv4_cidr_or_address("10.0.0.0/33"));
        assert!(!is_ipv4_cidr_or_address("10.0.0/24"));
        assert!(!is_ipv4_cidr_or_address("10.0.0.0/"));
        assert!(!is_ipv4_cidr_or_address(""));
    }

    #[test]
    fn cidr_block_requires_prefix() {
        assert!(invalid_cidr_block("10.0.0.1"));
        assert!(!invalid_cidr_block("10.10.10.0/24"));
    }

    #[test]
    fn port_bounds_depend_on_field() {
        assert!(valid_port_range(PortField::PortMin, 22));
        assert!(!valid_port_range(PortField::PortMax, 0));
        assert!(valid_port_range(PortField::IcmpType, 0));
        assert!(!valid_port_range(PortField::IcmpType, 255));
        assert!(valid_port_range(PortField::IcmpCode, 255));
    }
}
