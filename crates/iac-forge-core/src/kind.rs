// crates/iac-forge-core/src/kind.rs
// ============================================================================
// Module: Resource Kinds
// Description: Closed enumeration of every resource-type tag in the tree.
// Purpose: Make resource dispatch total and reject unknown tags at the boundary.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every collection in the configuration tree, including nested child
//! collections, is named by a [`ResourceKind`]. Each kind knows where its
//! records live: a top-level array, a top-level singleton object, or an array
//! field inside the records of a parent kind.
//!
//! Parsing an unrecognized tag fails with [`KindError`]; there is no
//! permissive fallback.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Resource-type tag for a collection in the configuration tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// Global options singleton (`_options`).
    Options,
    /// Resource groups.
    ResourceGroups,
    /// Key management instances.
    KeyManagement,
    /// Encryption keys owned by a key management instance.
    EncryptionKeys,
    /// Object storage instances.
    ObjectStorage,
    /// Buckets owned by an object storage instance.
    Buckets,
    /// Service credentials owned by an object storage instance.
    CosKeys,
    /// Secrets manager instances.
    SecretsManager,
    /// Virtual private clouds.
    Vpcs,
    /// Subnets owned by a VPC.
    Subnets,
    /// Security groups.
    SecurityGroups,
    /// Rules owned by a security group.
    SgRules,
    /// VPC SSH keys.
    SshKeys,
    /// Transit gateways.
    TransitGateways,
    /// DNS service instances.
    Dns,
    /// DNS zones owned by a DNS instance.
    DnsZones,
    /// DNS records owned by a DNS instance.
    DnsRecords,
    /// Custom resolvers owned by a DNS instance.
    DnsCustomResolvers,
    /// Cloud database instances.
    Icd,
    /// Event streams instances.
    EventStreams,
    /// IAM access groups.
    AccessGroups,
    /// Access policies owned by an access group.
    AccessPolicies,
    /// Dynamic rules owned by an access group.
    DynamicPolicies,
    /// IAM account settings singleton.
    IamAccountSettings,
    /// App ID instances.
    Appid,
    /// Keys owned by an App ID instance.
    AppidKeys,
    /// Activity tracker singleton.
    Atracker,
    /// Classic infrastructure SSH keys.
    ClassicSshKeys,
    /// Classic infrastructure VLANs.
    ClassicVlans,
}

/// Where the records of a kind are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Ordered array under the kind's top-level key.
    Collection,
    /// Single object under the kind's top-level key.
    Singleton,
    /// Ordered array stored in `field` of each record of `parent`.
    Nested {
        /// Kind that owns the child array.
        parent: ResourceKind,
        /// Field on the parent record holding the child array.
        field: &'static str,
    },
}

/// Errors raised when parsing a resource-type tag.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KindError {
    /// Tag does not name any known resource type.
    #[error("unknown resource type: {0}")]
    UnknownResourceKind(String),
}

// ============================================================================
// SECTION: Kind Table
// ============================================================================

impl ResourceKind {
    /// Every kind, parents listed before their children.
    pub const ALL: [Self; 29] = [
        Self::Options,
        Self::ResourceGroups,
        Self::KeyManagement,
        Self::EncryptionKeys,
        Self::ObjectStorage,
        Self::Buckets,
        Self::CosKeys,
        Self::SecretsManager,
        Self::Vpcs,
        Self::Subnets,
        Self::SecurityGroups,
        Self::SgRules,
        Self::SshKeys,
        Self::TransitGateways,
        Self::Dns,
        Self::DnsZones,
        Self::DnsRecords,
        Self::DnsCustomResolvers,
        Self::Icd,
        Self::EventStreams,
        Self::AccessGroups,
        Self::AccessPolicies,
        Self::DynamicPolicies,
        Self::IamAccountSettings,
        Self::Appid,
        Self::AppidKeys,
        Self::Atracker,
        Self::ClassicSshKeys,
        Self::ClassicVlans,
    ];

    /// Returns the stable tag for this kind.
    ///
    /// For top-level kinds the tag is also the key in the configuration tree.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Options => "_options",
            Self::ResourceGroups => "resource_groups",
            Self::KeyManagement => "key_management",
            Self::EncryptionKeys => "encryption_keys",
            Self::ObjectStorage => "object_storage",
            Self::Buckets => "buckets",
            Self::CosKeys => "cos_keys",
            Self::SecretsManager => "secrets_manager",
            Self::Vpcs => "vpcs",
            Self::Subnets => "subnets",
            Self::SecurityGroups => "security_groups",
            Self::SgRules => "sg_rules",
            Self::SshKeys => "ssh_keys",
            Self::TransitGateways => "transit_gateways",
            Self::Dns => "dns",
            Self::DnsZones => "zones",
            Self::DnsRecords => "records",
            Self::DnsCustomResolvers => "custom_resolvers",
            Self::Icd => "icd",
            Self::EventStreams => "event_streams",
            Self::AccessGroups => "access_groups",
            Self::AccessPolicies => "policies",
            Self::DynamicPolicies => "dynamic_policies",
            Self::IamAccountSettings => "iam_account_settings",
            Self::Appid => "appid",
            Self::AppidKeys => "appid_key",
            Self::Atracker => "atracker",
            Self::ClassicSshKeys => "classic_ssh_keys",
            Self::ClassicVlans => "classic_vlans",
        }
    }

    /// Returns where records of this kind are stored.
    #[must_use]
    pub const fn location(self) -> Location {
        match self {
            Self::Options | Self::IamAccountSettings | Self::Atracker => Location::Singleton,
            Self::EncryptionKeys => nested(Self::KeyManagement, "keys"),
            Self::Buckets => nested(Self::ObjectStorage, "buckets"),
            Self::CosKeys => nested(Self::ObjectStorage, "keys"),
            Self::Subnets => nested(Self::Vpcs, "subnets"),
            Self::SgRules => nested(Self::SecurityGroups, "rules"),
            Self::DnsZones => nested(Self::Dns, "zones"),
            Self::DnsRecords => nested(Self::Dns, "records"),
            Self::DnsCustomResolvers => nested(Self::Dns, "custom_resolvers"),
            Self::AccessPolicies => nested(Self::AccessGroups, "policies"),
            Self::DynamicPolicies => nested(Self::AccessGroups, "dynamic_policies"),
            Self::AppidKeys => nested(Self::Appid, "keys"),
            Self::ResourceGroups
            | Self::KeyManagement
            | Self::ObjectStorage
            | Self::SecretsManager
            | Self::Vpcs
            | Self::SecurityGroups
            | Self::SshKeys
            | Self::TransitGateways
            | Self::Dns
            | Self::Icd
            | Self::EventStreams
            | Self::AccessGroups
            | Self::Appid
            | Self::ClassicSshKeys
            | Self::ClassicVlans => Location::Collection,
        }
    }

    /// Returns the parent kind for nested kinds.
    #[must_use]
    pub const fn parent(self) -> Option<Self> {
        match self.location() {
            Location::Nested {
                parent, ..
            } => Some(parent),
            Location::Collection | Location::Singleton => None,
        }
    }

    /// Returns true when the kind is stored at the top level of the tree.
    #[must_use]
    pub const fn is_top_level(self) -> bool {
        self.parent().is_none()
    }

    /// Returns the nested kinds whose records live inside this kind's records.
    #[must_use]
    pub fn children(self) -> Vec<Self> {
        Self::ALL.into_iter().filter(|kind| kind.parent() == Some(self)).collect()
    }
}

/// Shorthand for a nested location.
const fn nested(parent: ResourceKind, field: &'static str) -> Location {
    Location::Nested {
        parent,
        field,
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = KindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| KindError::UnknownResourceKind(value.to_string()))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_from_str() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.as_str().parse::<ResourceKind>(), Ok(kind));
        }
    }

    #[test]
    fn unknown_tags_are_rejected() {
        assert_eq!(
            "scc".parse::<ResourceKind>(),
            Err(KindError::UnknownResourceKind("scc".to_string()))
        );
    }

    #[test]
    fn dns_owns_three_child_kinds() {
        assert_eq!(
            ResourceKind::Dns.children(),
            vec![ResourceKind::DnsZones, ResourceKind::DnsRecords, ResourceKind::DnsCustomResolvers]
        );
    }
}
