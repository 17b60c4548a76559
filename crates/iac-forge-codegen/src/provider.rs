// crates/iac-forge-codegen/src/provider.rs
// ============================================================================
// Module: Provider Generator
// Description: The `ibm` provider block and its classic and Power VS aliases.
// Purpose: Emit the provider section that opens every generated document.
// Dependencies: iac-forge-core
// ============================================================================

//! ## Overview
//! The default provider uses the API key and region variables. A `classic`
//! alias is added when classic infrastructure is enabled, and one alias per
//! Power VS zone when Power VS is enabled.

// ============================================================================
// SECTION: Imports
// ============================================================================

use iac_forge_core::ResourceKind;
use iac_forge_core::str_list;

use crate::document::Block;
use crate::document::Expr;
use crate::document::Section;
use crate::document::render_sections;
use crate::naming::snake_case;
use crate::refs::Refs;

// ============================================================================
// SECTION: Constants
// ============================================================================

const TIMEOUT_SECONDS: i64 = 60;

/// Zone prefixes whose region is the zone without its digits.
const DIGIT_SUFFIXED: [&str; 5] = ["lon", "syd", "tok", "osa", "sao"];

const US_EAST_ZONES: [&str; 3] = ["us-east", "wdc06", "wdc07"];

const MADRID_ZONES: [&str; 2] = ["mad02", "mad04"];

// ============================================================================
// SECTION: Generation
// ============================================================================

/// Region expression for a Power VS zone.
///
/// The first matching rule wins; zones no rule covers use `var.region`.
#[must_use]
pub fn power_vs_region(zone: &str, region: &str) -> Expr {
    if let Some(prefix) = DIGIT_SUFFIXED.iter().find(|prefix| has_digit_suffix(zone, prefix)) {
        return Expr::str(*prefix);
    }
    if region != "us-east" && US_EAST_ZONES.contains(&zone) {
        return Expr::str("us-east");
    }
    if has_digit_suffix(zone, "dal") {
        return Expr::str("us-south");
    }
    if MADRID_ZONES.contains(&zone) {
        return Expr::str("mad");
    }
    Expr::raw("var.region")
}

fn has_digit_suffix(zone: &str, prefix: &str) -> bool {
    zone.strip_prefix(prefix)
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|ch| ch.is_ascii_digit()))
}

/// Formats the provider blocks.
#[must_use]
pub fn format_providers(refs: &Refs<'_>) -> Vec<Block> {
    let mut blocks = vec![
        Block::provider("ibm")
            .attr("ibmcloud_api_key", Expr::raw("var.ibmcloud_api_key"))
            .attr("region", Expr::raw("var.region"))
            .attr("ibmcloud_timeout", Expr::int(TIMEOUT_SECONDS)),
    ];
    if refs.option_enabled("enable_classic") {
        blocks.push(
            Block::provider("ibm")
                .attr("alias", Expr::str("classic"))
                .attr("ibmcloud_timeout", Expr::int(TIMEOUT_SECONDS))
                .attr("iaas_classic_username", Expr::raw("var.iaas_classic_username"))
                .attr("iaas_classic_api_key", Expr::raw("var.iaas_classic_api_key")),
        );
    }
    if refs.option_enabled("enable_power_vs") {
        let zones = refs
            .tree()
            .singleton(ResourceKind::Options)
            .map(|options| str_list(options, "power_vs_zones"))
            .unwrap_or_default();
        for zone in zones {
            blocks.push(
                Block::provider("ibm")
                    .attr("alias", Expr::str(snake_case(&format!("power_vs_{zone}"))))
                    .attr("ibmcloud_api_key", Expr::raw("var.ibmcloud_api_key"))
                    .attr("region", power_vs_region(zone, refs.region()))
                    .attr("zone", Expr::str(zone))
                    .attr("ibmcloud_timeout", Expr::int(TIMEOUT_SECONDS)),
            );
        }
    }
    blocks
}

/// Provider section; always present.
#[must_use]
pub fn provider_tf(refs: &Refs<'_>) -> Option<String> {
    render_sections(Section::non_empty("IBM Cloud Provider", format_providers(refs)))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_vs_regions_follow_zone_rules() {
        assert_eq!(power_vs_region("lon04", "us-south"), Expr::str("lon"));
        assert_eq!(power_vs_region("sao01", "us-south"), Expr::str("sao"));
        assert_eq!(power_vs_region("wdc06", "us-south"), Expr::str("us-east"));
        assert_eq!(power_vs_region("wdc06", "us-east"), Expr::raw("var.region"));
        assert_eq!(power_vs_region("dal12", "us-east"), Expr::str("us-south"));
        assert_eq!(power_vs_region("mad04", "eu-es"), Expr::str("mad"));
        assert_eq!(power_vs_region("eu-de-1", "eu-de"), Expr::raw("var.region"));
    }
}
