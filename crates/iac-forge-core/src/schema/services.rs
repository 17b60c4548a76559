// crates/iac-forge-core/src/schema/services.rs
// ============================================================================
// Module: Service Schemas
// Description: Resource groups, key management, storage, databases, and App ID.
// Purpose: Define managed service instances and the children they own.
// Dependencies: iac-forge-validate, serde_json, crate::schema
// ============================================================================

//! ## Overview
//! Service instances are top-level collections that mostly reference a
//! resource group and, for encrypted services, a key management instance and
//! one of its keys. The key a bucket or service uses is resolved inside the
//! key management instance named by the service.

// ============================================================================
// SECTION: Imports
// ============================================================================

use iac_forge_validate::invalid_ip_comma_list;
use iac_forge_validate::invalid_name_format;
use iac_forge_validate::is_null_or_empty;
use iac_forge_validate::number_value;
use serde_json::Value;
use serde_json::json;

use super::DefaultValue;
use super::FieldSchema;
use super::NAME_FIELD;
use super::Reference;
use super::ResourceSchema;
use super::SchemaContext;
use super::Scope;
use super::any_missing;
use super::fields_invalid;
use super::invalid_in_range;
use super::invalid_name;
use super::number_text;
use super::options::names_of;
use super::prefixed_name;
use super::range;
use crate::context::Range;
use crate::kind::ResourceKind;
use crate::reference::find;
use crate::tree::ConfigTree;
use crate::tree::Record;
use crate::tree::non_empty_str;
use crate::tree::str_field;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Resource groups written by a new store.
const SEEDED_RESOURCE_GROUPS: [&str; 3] = ["service-rg", "management-rg", "workload-rg"];
/// Key rotation interval limits in months.
const KEY_ROTATION: Range = range(1, 12);
/// Database memory limits in GB when the caller provides none.
const ICD_MEMORY: Range = range(1, 112);
/// Database disk limits in GB when the caller provides none.
const ICD_DISK: Range = range(5, 4_096);
/// Database dedicated core limits when the caller provides none.
const ICD_CPU: Range = range(0, 28);
/// Database services that can be provisioned.
pub const ICD_SERVICES: [&str; 7] = [
    "databases-for-postgresql",
    "databases-for-etcd",
    "databases-for-redis",
    "databases-for-mongodb",
    "databases-for-mysql",
    "messages-for-rabbitmq",
    "databases-for-elasticsearch",
];
/// Event streams throughput tiers.
pub const EVENT_STREAMS_THROUGHPUT: [&str; 3] = ["150MB/s", "300MB/s", "450MB/s"];
/// Event streams storage tiers.
pub const EVENT_STREAMS_STORAGE: [&str; 3] = ["2TB", "6TB", "12TB"];

/// Resource group reference shared by most services.
const RESOURCE_GROUP_REF: Reference = Reference::one("resource_group", ResourceKind::ResourceGroups);
/// Key management reference shared by encrypted services.
const KMS_REF: Reference = Reference::one("kms", ResourceKind::KeyManagement);
/// Encryption key inside the key management instance named by `kms`.
const ENCRYPTION_KEY_REF: Reference =
    Reference::one("encryption_key", ResourceKind::EncryptionKeys).scoped(Scope::Field("kms"));

/// Resource group selector.
const RESOURCE_GROUP_FIELD: FieldSchema = FieldSchema {
    default: Some(DefaultValue::Null),
    invalid: Some(|record, _| is_null_or_empty(record.get("resource_group"))),
    invalid_text: Some(|_, _| "Select a resource group".to_string()),
    groups: Some(|_, ctx| names_of(ctx, ResourceKind::ResourceGroups)),
    ..FieldSchema::new("resource_group")
};

/// Key management selector.
const KMS_FIELD: FieldSchema = FieldSchema {
    default: Some(DefaultValue::Null),
    groups: Some(|_, ctx| names_of(ctx, ResourceKind::KeyManagement)),
    ..FieldSchema::new("kms")
};

/// Encryption key selector, limited to the keys of the selected instance.
const ENCRYPTION_KEY_FIELD: FieldSchema = FieldSchema {
    default: Some(DefaultValue::Null),
    groups: Some(|record, ctx| {
        let kms = str_field(record, "kms");
        match kms {
            Some(kms) => ctx
                .tree
                .names(ResourceKind::EncryptionKeys, Some(kms))
                .into_iter()
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        }
    }),
    ..FieldSchema::new("encryption_key")
};

const USE_DATA_FIELD: FieldSchema = FieldSchema {
    default: Some(DefaultValue::Bool(false)),
    ..FieldSchema::new("use_data")
};

const NAMED_WITH_PREFIX: FieldSchema = FieldSchema {
    helper_text: Some(prefixed_name),
    ..NAME_FIELD
};

// ============================================================================
// SECTION: Resource Groups
// ============================================================================

/// Resource groups.
pub static RESOURCE_GROUPS: ResourceSchema = ResourceSchema {
    kind: ResourceKind::ResourceGroups,
    parent_link: None,
    defaults: &[],
    init: Some(resource_groups_init),
    on_create: None,
    on_save: None,
    references: &[],
    fields: &[
        FieldSchema {
            helper_text: Some(|record, ctx| {
                if record.get("use_prefix").and_then(Value::as_bool).unwrap_or(false) {
                    prefixed_name(record, ctx)
                } else {
                    str_field(record, "name").unwrap_or_default().to_string()
                }
            }),
            ..NAME_FIELD
        },
        FieldSchema {
            default: Some(DefaultValue::Bool(true)),
            ..FieldSchema::new("use_prefix")
        },
        USE_DATA_FIELD,
    ],
    disable_save: invalid_name,
};

fn resource_groups_init(tree: &mut ConfigTree) {
    let groups = SEEDED_RESOURCE_GROUPS
        .iter()
        .map(|name| json!({"use_prefix": true, "name": name, "use_data": false}))
        .collect();
    tree.set(ResourceKind::ResourceGroups.as_str(), Value::Array(groups));
}

// ============================================================================
// SECTION: Key Management
// ============================================================================

/// Key management instances.
pub static KEY_MANAGEMENT: ResourceSchema = ResourceSchema {
    kind: ResourceKind::KeyManagement,
    parent_link: None,
    defaults: &[("keys", DefaultValue::StrList(&[]))],
    init: None,
    on_create: None,
    on_save: None,
    references: &[RESOURCE_GROUP_REF],
    fields: &[
        NAMED_WITH_PREFIX,
        RESOURCE_GROUP_FIELD,
        USE_DATA_FIELD,
        FieldSchema {
            default: Some(DefaultValue::Bool(false)),
            ..FieldSchema::new("use_hs_crypto")
        },
        FieldSchema {
            default: Some(DefaultValue::Bool(true)),
            ..FieldSchema::new("authorize_vpc_reader_role")
        },
    ],
    disable_save: |record, ctx| invalid_name(record, ctx) || any_missing(record, &["resource_group"]),
};

/// Encryption keys owned by a key management instance.
pub static ENCRYPTION_KEYS: ResourceSchema = ResourceSchema {
    kind: ResourceKind::EncryptionKeys,
    parent_link: None,
    defaults: &[],
    init: None,
    on_create: None,
    on_save: None,
    references: &[],
    fields: &[
        NAMED_WITH_PREFIX,
        FieldSchema {
            default: Some(DefaultValue::Bool(true)),
            ..FieldSchema::new("root_key")
        },
        FieldSchema {
            optional: true,
            invalid: Some(|record, _| {
                non_empty_str(record, "key_ring").is_some_and(invalid_name_format)
            }),
            invalid_text: Some(|_, _| "Invalid key ring name".to_string()),
            ..FieldSchema::new("key_ring")
        },
        FieldSchema {
            default: Some(DefaultValue::Bool(false)),
            ..FieldSchema::new("force_delete")
        },
        FieldSchema {
            default: Some(DefaultValue::Bool(false)),
            ..FieldSchema::new("dual_auth_delete")
        },
        FieldSchema {
            default: Some(DefaultValue::Int(1)),
            invalid: Some(|record, _| invalid_in_range(record, "rotation", KEY_ROTATION)),
            invalid_text: Some(|_, _| number_text(KEY_ROTATION)),
            ..FieldSchema::new("rotation")
        },
    ],
    disable_save: |record, ctx| {
        invalid_name(record, ctx) || fields_invalid(record, ctx, &["key_ring", "rotation"])
    },
};

// ============================================================================
// SECTION: Object Storage
// ============================================================================

/// Object storage instances.
pub static OBJECT_STORAGE: ResourceSchema = ResourceSchema {
    kind: ResourceKind::ObjectStorage,
    parent_link: None,
    defaults: &[("buckets", DefaultValue::StrList(&[])), ("keys", DefaultValue::StrList(&[]))],
    init: None,
    on_create: None,
    on_save: None,
    references: &[RESOURCE_GROUP_REF, KMS_REF],
    fields: &[
        NAMED_WITH_PREFIX,
        USE_DATA_FIELD,
        RESOURCE_GROUP_FIELD,
        KMS_FIELD,
        FieldSchema {
            default: Some(DefaultValue::Str("standard")),
            ..FieldSchema::new("plan")
        },
        FieldSchema {
            default: Some(DefaultValue::Bool(true)),
            ..FieldSchema::new("use_random_suffix")
        },
    ],
    disable_save: |record, ctx| {
        invalid_name(record, ctx) || any_missing(record, &["kms", "resource_group"])
    },
};

/// Buckets owned by an object storage instance.
pub static BUCKETS: ResourceSchema = ResourceSchema {
    kind: ResourceKind::Buckets,
    parent_link: None,
    defaults: &[],
    init: None,
    on_create: None,
    on_save: None,
    references: &[Reference::one("kms_key", ResourceKind::EncryptionKeys)
        .scoped(Scope::ParentField("kms"))],
    fields: &[
        NAMED_WITH_PREFIX,
        FieldSchema {
            default: Some(DefaultValue::Str("standard")),
            groups: Some(|_, _| {
                ["standard", "vault", "cold", "smart"].map(str::to_string).to_vec()
            }),
            ..FieldSchema::new("storage_class")
        },
        FieldSchema {
            default: Some(DefaultValue::Null),
            invalid: Some(invalid_bucket_key),
            invalid_text: Some(|_, _| "Select an encryption key".to_string()),
            ..FieldSchema::new("kms_key")
        },
        FieldSchema {
            default: Some(DefaultValue::Bool(false)),
            ..FieldSchema::new("force_delete")
        },
        FieldSchema {
            default: Some(DefaultValue::Str("public")),
            ..FieldSchema::new("endpoint")
        },
    ],
    disable_save: |record, ctx| invalid_name(record, ctx) || invalid_bucket_key(record, ctx),
};

/// The bucket key must name a key of the parent instance's key management.
///
/// Without a parent in context any encryption key with that name is accepted.
fn invalid_bucket_key(record: &Record, ctx: &SchemaContext<'_>) -> bool {
    let Some(key) = non_empty_str(record, "kms_key") else {
        return true;
    };
    let Some(parent) = ctx.op.parent() else {
        return ctx.tree.names(ResourceKind::EncryptionKeys, None).iter().all(|name| *name != key);
    };
    let kms = find(ctx.tree, ResourceKind::ObjectStorage, None, parent)
        .and_then(|instance| str_field(instance, "kms"));
    match kms {
        Some(kms) => find(ctx.tree, ResourceKind::EncryptionKeys, Some(kms), key).is_none(),
        None => true,
    }
}

/// Service credentials owned by an object storage instance.
pub static COS_KEYS: ResourceSchema = ResourceSchema {
    kind: ResourceKind::CosKeys,
    parent_link: None,
    defaults: &[],
    init: None,
    on_create: None,
    on_save: None,
    references: &[],
    fields: &[
        NAMED_WITH_PREFIX,
        FieldSchema {
            default: Some(DefaultValue::Str("Writer")),
            groups: Some(|_, _| {
                ["Object Writer", "Object Reader", "Content Reader", "Reader", "Writer", "Manager"]
                    .map(str::to_string)
                    .to_vec()
            }),
            ..FieldSchema::new("role")
        },
        FieldSchema {
            default: Some(DefaultValue::Bool(false)),
            ..FieldSchema::new("enable_hmac")
        },
    ],
    disable_save: invalid_name,
};

// ============================================================================
// SECTION: Secrets Manager
// ============================================================================

/// Secrets manager instances.
pub static SECRETS_MANAGER: ResourceSchema = ResourceSchema {
    kind: ResourceKind::SecretsManager,
    parent_link: None,
    defaults: &[],
    init: None,
    on_create: None,
    on_save: None,
    references: &[RESOURCE_GROUP_REF, KMS_REF, ENCRYPTION_KEY_REF],
    fields: &[
        NAMED_WITH_PREFIX,
        RESOURCE_GROUP_FIELD,
        KMS_FIELD,
        ENCRYPTION_KEY_FIELD,
        FieldSchema {
            default: Some(DefaultValue::Str("standard")),
            groups: Some(|_, _| vec!["standard".to_string(), "trial".to_string()]),
            ..FieldSchema::new("plan")
        },
    ],
    disable_save: |record, ctx| {
        invalid_name(record, ctx) || any_missing(record, &["encryption_key", "resource_group"])
    },
};

// ============================================================================
// SECTION: Cloud Databases
// ============================================================================

/// Cloud database instances.
pub static ICD: ResourceSchema = ResourceSchema {
    kind: ResourceKind::Icd,
    parent_link: None,
    defaults: &[],
    init: None,
    on_create: None,
    on_save: None,
    references: &[RESOURCE_GROUP_REF, KMS_REF, ENCRYPTION_KEY_REF],
    fields: &[
        NAMED_WITH_PREFIX,
        USE_DATA_FIELD,
        RESOURCE_GROUP_FIELD,
        FieldSchema {
            groups: Some(|_, _| ICD_SERVICES.map(str::to_string).to_vec()),
            on_state_change: Some(|record| {
                record.insert("version".to_string(), Value::Null);
            }),
            ..FieldSchema::new("service")
        },
        FieldSchema {
            default: Some(DefaultValue::Str("standard")),
            ..FieldSchema::new("plan")
        },
        FieldSchema {
            default: Some(DefaultValue::Str("member")),
            ..FieldSchema::new("group_id")
        },
        FieldSchema {
            optional: true,
            invalid: Some(|record, ctx| {
                icd_out_of_range(record, "memory", ctx.op.range_or("memory", ICD_MEMORY))
            }),
            invalid_text: Some(|_, ctx| number_text(ctx.op.range_or("memory", ICD_MEMORY))),
            ..FieldSchema::new("memory")
        },
        FieldSchema {
            optional: true,
            invalid: Some(|record, ctx| {
                icd_out_of_range(record, "disk", ctx.op.range_or("disk", ICD_DISK))
            }),
            invalid_text: Some(|_, ctx| number_text(ctx.op.range_or("disk", ICD_DISK))),
            ..FieldSchema::new("disk")
        },
        FieldSchema {
            optional: true,
            invalid: Some(|record, ctx| {
                icd_out_of_range(record, "cpu", ctx.op.range_or("cpu", ICD_CPU))
            }),
            invalid_text: Some(|_, ctx| number_text(ctx.op.range_or("cpu", ICD_CPU))),
            ..FieldSchema::new("cpu")
        },
        KMS_FIELD,
        ENCRYPTION_KEY_FIELD,
        FieldSchema {
            optional: true,
            ..FieldSchema::new("version")
        },
    ],
    disable_save: |record, ctx| {
        invalid_name(record, ctx)
            || any_missing(record, &["resource_group", "service"])
            || fields_invalid(record, ctx, &["memory", "disk", "cpu"])
    },
};

/// Zero and empty values leave the allocation unset and are not checked.
fn icd_out_of_range(record: &Record, field: &str, limits: Range) -> bool {
    let unset = record.get(field).is_none_or(|value| {
        is_null_or_empty(Some(value)) || number_value(value).is_some_and(|number| number.abs() < f64::EPSILON)
    });
    !unset && invalid_in_range(record, field, limits)
}

// ============================================================================
// SECTION: Event Streams
// ============================================================================

/// Event streams instances.
pub static EVENT_STREAMS: ResourceSchema = ResourceSchema {
    kind: ResourceKind::EventStreams,
    parent_link: None,
    defaults: &[],
    init: None,
    on_create: None,
    on_save: None,
    references: &[RESOURCE_GROUP_REF],
    fields: &[
        NAMED_WITH_PREFIX,
        FieldSchema {
            groups: Some(|_, _| {
                ["lite", "standard", "enterprise"].map(str::to_string).to_vec()
            }),
            ..FieldSchema::new("plan")
        },
        RESOURCE_GROUP_FIELD,
        FieldSchema {
            default: Some(DefaultValue::Str("private")),
            groups: Some(|_, _| {
                ["public", "private", "public-and-private"].map(str::to_string).to_vec()
            }),
            hide_when: Some(not_enterprise),
            ..FieldSchema::new("endpoints")
        },
        FieldSchema {
            optional: true,
            invalid: Some(|record, _| {
                invalid_ip_comma_list(str_field(record, "private_ip_allowlist"))
            }),
            invalid_text: Some(|_, _| {
                "Enter a comma separated list of IP addresses or CIDR blocks".to_string()
            }),
            hide_when: Some(not_enterprise),
            ..FieldSchema::new("private_ip_allowlist")
        },
        FieldSchema {
            invalid: Some(|record, _| not_one_of(record, "throughput", &EVENT_STREAMS_THROUGHPUT)),
            groups: Some(|_, _| EVENT_STREAMS_THROUGHPUT.map(str::to_string).to_vec()),
            hide_when: Some(not_enterprise),
            ..FieldSchema::new("throughput")
        },
        FieldSchema {
            invalid: Some(|record, _| not_one_of(record, "storage_size", &EVENT_STREAMS_STORAGE)),
            groups: Some(|_, _| EVENT_STREAMS_STORAGE.map(str::to_string).to_vec()),
            hide_when: Some(not_enterprise),
            ..FieldSchema::new("storage_size")
        },
    ],
    disable_save: |record, ctx| {
        invalid_name(record, ctx)
            || any_missing(record, &["resource_group", "plan"])
            || fields_invalid(record, ctx, &["private_ip_allowlist", "throughput", "storage_size"])
    },
};

/// Enterprise-only settings are hidden for other plans.
fn not_enterprise(record: &Record) -> bool {
    str_field(record, "plan") != Some("enterprise")
}

/// A set value must be one of `allowed`.
fn not_one_of(record: &Record, field: &str, allowed: &[&str]) -> bool {
    non_empty_str(record, field).is_some_and(|value| !allowed.contains(&value))
}

// ============================================================================
// SECTION: App ID
// ============================================================================

/// App ID instances.
pub static APPID: ResourceSchema = ResourceSchema {
    kind: ResourceKind::Appid,
    parent_link: None,
    defaults: &[("keys", DefaultValue::StrList(&[]))],
    init: None,
    on_create: None,
    on_save: None,
    references: &[RESOURCE_GROUP_REF],
    fields: &[NAMED_WITH_PREFIX, USE_DATA_FIELD, RESOURCE_GROUP_FIELD],
    disable_save: |record, ctx| invalid_name(record, ctx) || any_missing(record, &["resource_group"]),
};

/// Keys owned by an App ID instance.
pub static APPID_KEYS: ResourceSchema = ResourceSchema {
    kind: ResourceKind::AppidKeys,
    parent_link: None,
    defaults: &[],
    init: None,
    on_create: None,
    on_save: None,
    references: &[],
    fields: &[NAMED_WITH_PREFIX],
    disable_save: invalid_name,
};

// ============================================================================
// SECTION: Tests
// ============================================================================
