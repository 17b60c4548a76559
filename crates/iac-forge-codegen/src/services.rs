// crates/iac-forge-codegen/src/services.rs
// ============================================================================
// Module: Service Generators
// Description: Key management, object storage, cloud databases, event
//              streams, secrets manager, App ID, and Activity Tracker.
// Purpose: Emit the platform services layered on the network.
// Dependencies: iac-forge-core, serde_json
// ============================================================================

//! ## Overview
//! Services encrypt with keys from a key management instance and log to
//! object storage buckets, so most blocks carry references built by
//! [`Refs`]. Instances imported with `use_data` render as data lookups and
//! keep their children as managed resources.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use iac_forge_core::Record;
use iac_forge_core::ResourceKind;
use iac_forge_core::bool_field;
use iac_forge_core::non_empty_str;
use iac_forge_core::str_field;
use iac_forge_core::str_list;
use serde_json::Value;

use crate::document::Block;
use crate::document::Expr;
use crate::document::Section;
use crate::document::render_sections;
use crate::document::timeouts;
use crate::naming::snake_case;
use crate::naming::title_case;
use crate::refs::Refs;
use crate::refs::bucket_label;
use crate::refs::key_label;
use crate::refs::record_label;
use crate::refs::var_prefixed;
use crate::units;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn children<'a>(record: &'a Record, field: &str) -> Vec<&'a Record> {
    record
        .get(field)
        .and_then(Value::as_array)
        .map(|records| records.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

/// `resource` or `data` block for a record that may be imported.
fn resource_or_data(record: &Record, kind: &str, label: String) -> Block {
    if bool_field(record, "use_data") { Block::data(kind, label) } else { Block::resource(kind, label) }
}

fn kms_service(refs: &Refs<'_>, kms: Option<&str>) -> &'static str {
    let hs_crypto = refs
        .lookup(ResourceKind::KeyManagement, kms)
        .is_some_and(|instance| bool_field(instance, "use_hs_crypto"));
    if hs_crypto { "hs-crypto" } else { "kms" }
}

/// Authorization policy letting `source` read keys from `kms`.
fn kms_policy(label: String, source_service: &str, source_instance: Expr, refs: &Refs<'_>, kms: Option<&str>) -> Block {
    Block::resource("ibm_iam_authorization_policy", label)
        .attr("source_service_name", Expr::str(source_service))
        .attr("source_resource_instance_id", source_instance)
        .attr("roles", Expr::str_list(["Reader"]))
        .attr("description", Expr::str("Allow service instance to read from KMS instance"))
        .attr("target_service_name", Expr::str(kms_service(refs, kms)))
        .attr("target_resource_instance_id", refs.kms_guid(kms))
}

/// Credential label for an object storage key.
#[must_use]
pub fn cos_key_label(cos: &str, key: &str) -> String {
    snake_case(&format!("{cos} object storage key {key}"))
}

// ============================================================================
// SECTION: Key Management
// ============================================================================

/// Formats a key management instance and its VPC block storage policy.
#[must_use]
pub fn format_kms_instance(kms: &Record, refs: &Refs<'_>) -> Vec<Block> {
    let name = record_label(kms);
    let service = if bool_field(kms, "use_hs_crypto") { "hs-crypto" } else { "kms" };
    let instance = if bool_field(kms, "use_data") {
        Block::data("ibm_resource_instance", snake_case(name))
            .attr("name", Expr::str(name))
            .attr("resource_group_id", refs.resource_group_id(str_field(kms, "resource_group")))
            .attr("service", Expr::str(service))
    } else {
        Block::resource("ibm_resource_instance", snake_case(name))
            .attr("name", var_prefixed(name))
            .attr("resource_group_id", refs.resource_group_id(str_field(kms, "resource_group")))
            .attr("service", Expr::str(service))
            .attr("plan", Expr::str("tiered-pricing"))
            .attr("location", Expr::raw("var.region"))
            .attr("tags", refs.tags())
    };
    let mut blocks = vec![instance];
    if bool_field(kms, "authorize_vpc_reader_role") {
        blocks.push(
            Block::resource("ibm_iam_authorization_policy", format!("{}_server_protect_policy", snake_case(name)))
                .attr("source_service_name", Expr::str("server-protect"))
                .attr("description", Expr::str("Allow block storage volumes to be encrypted by KMS instance"))
                .attr("roles", Expr::str_list(["Reader"]))
                .attr("target_service_name", Expr::str(service))
                .attr("target_resource_instance_id", refs.kms_guid(Some(name))),
        );
    }
    blocks
}

fn ring_label(kms: &str, ring: &str) -> String {
    snake_case(&format!("{kms} {ring} ring"))
}

/// Formats the key rings used by the keys of `kms`, each once.
#[must_use]
pub fn format_key_rings(kms: &Record, refs: &Refs<'_>) -> Vec<Block> {
    let name = record_label(kms);
    let rings: BTreeSet<&str> = children(kms, "keys").into_iter().filter_map(|key| non_empty_str(key, "key_ring")).collect();
    rings
        .into_iter()
        .map(|ring| {
            Block::resource("ibm_kms_key_rings", ring_label(name, ring))
                .attr("instance_id", refs.kms_guid(Some(name)))
                .attr("key_ring_id", var_prefixed(ring))
        })
        .collect()
}

/// Formats an encryption key and its rotation policy.
#[must_use]
pub fn format_encryption_key(kms: &str, key: &Record, refs: &Refs<'_>) -> Vec<Block> {
    let name = record_label(key);
    let label = key_label(kms, name);
    let ring = non_empty_str(key, "key_ring")
        .map(|ring| Expr::raw(format!("ibm_kms_key_rings.{}.key_ring_id", ring_label(kms, ring))));
    let mut blocks = vec![
        Block::resource("ibm_kms_key", label.clone())
            .attr("instance_id", refs.kms_guid(Some(kms)))
            .attr("key_name", var_prefixed(name))
            .attr("standard_key", Expr::Bool(!bool_field(key, "root_key")))
            .attr_opt("key_ring_id", ring)
            .attr("force_delete", Expr::Bool(bool_field(key, "force_delete")))
            .attr("endpoint_type", Expr::str("public")),
    ];
    let rotation = key.get("rotation").and_then(Value::as_i64).filter(|months| *months > 0);
    if let Some(months) = rotation {
        blocks.push(
            Block::resource("ibm_kms_key_policies", format!("{label}_policy"))
                .attr("instance_id", refs.kms_guid(Some(kms)))
                .attr("key_id", Expr::raw(format!("ibm_kms_key.{label}.key_id")))
                .block(Block::nested("rotation").attr("interval_month", Expr::int(months)))
                .block(Block::nested("dual_auth_delete").attr("enabled", Expr::Bool(bool_field(key, "dual_auth_delete")))),
        );
    }
    blocks
}

/// One section per key management instance.
#[must_use]
pub fn kms_tf(refs: &Refs<'_>) -> Option<String> {
    render_sections(refs.tree().top_level(ResourceKind::KeyManagement).into_iter().map(|kms| {
        let name = record_label(kms);
        let mut blocks = format_kms_instance(kms, refs);
        blocks.extend(format_key_rings(kms, refs));
        for key in children(kms, "keys") {
            blocks.extend(format_encryption_key(name, key, refs));
        }
        Section::new(format!("{} Key Management", title_case(name)), blocks)
    }))
}

// ============================================================================
// SECTION: Object Storage
// ============================================================================

fn random_suffix(cos: &Record) -> String {
    if bool_field(cos, "use_random_suffix") {
        format!("-${{random_string.{}_random_suffix.result}}", snake_case(record_label(cos)))
    } else {
        String::new()
    }
}

/// Formats an object storage instance with its suffix and KMS policy.
#[must_use]
pub fn format_cos_instance(cos: &Record, refs: &Refs<'_>) -> Vec<Block> {
    let name = record_label(cos);
    let mut blocks = Vec::new();
    if bool_field(cos, "use_random_suffix") {
        blocks.push(
            Block::resource("random_string", format!("{}_random_suffix", snake_case(name)))
                .attr("length", Expr::int(8))
                .attr("special", Expr::Bool(false))
                .attr("upper", Expr::Bool(false)),
        );
    }
    let display = if bool_field(cos, "use_data") {
        Expr::str(name)
    } else {
        Expr::str(format!("${{var.prefix}}-{name}-object-storage{}", random_suffix(cos)))
    };
    let mut instance = resource_or_data(cos, "ibm_resource_instance", format!("{}_object_storage", snake_case(name)))
        .attr("name", display)
        .attr("resource_group_id", refs.resource_group_id(str_field(cos, "resource_group")))
        .attr("service", Expr::str("cloud-object-storage"));
    if !bool_field(cos, "use_data") {
        instance = instance
            .attr("location", Expr::str("global"))
            .attr("plan", Expr::str(str_field(cos, "plan").unwrap_or("standard")))
            .attr("tags", refs.tags());
    }
    blocks.push(instance);
    if let Some(kms) = non_empty_str(cos, "kms") {
        blocks.push(kms_policy(
            snake_case(&format!("{name} cos to {kms} kms policy")),
            "cloud-object-storage",
            refs.cos_instance(Some(name), "guid"),
            refs,
            Some(kms),
        ));
    }
    blocks
}

/// Formats a bucket of `cos`.
#[must_use]
pub fn format_bucket(cos: &Record, bucket: &Record, refs: &Refs<'_>) -> Block {
    let cos_name = record_label(cos);
    let name = record_label(bucket);
    Block::resource("ibm_cos_bucket", bucket_label(cos_name, name))
        .attr("bucket_name", Expr::str(format!("${{var.prefix}}-{name}{}", random_suffix(cos))))
        .attr("resource_instance_id", refs.cos_instance(Some(cos_name), "id"))
        .attr("storage_class", Expr::str(str_field(bucket, "storage_class").unwrap_or("standard")))
        .attr("endpoint_type", Expr::str(str_field(bucket, "endpoint").unwrap_or("public")))
        .attr("force_delete", Expr::Bool(bool_field(bucket, "force_delete")))
        .attr("region_location", Expr::raw("var.region"))
        .attr("key_protect", refs.key_crn(str_field(cos, "kms"), str_field(bucket, "kms_key")))
}

/// Formats a service credential of `cos`.
#[must_use]
pub fn format_cos_key(cos: &Record, key: &Record, refs: &Refs<'_>) -> Block {
    let cos_name = record_label(cos);
    let name = record_label(key);
    let block = Block::resource("ibm_resource_key", cos_key_label(cos_name, name))
        .attr("name", Expr::str(format!("${{var.prefix}}-{name}{}", random_suffix(cos))))
        .attr("resource_instance_id", refs.cos_instance(Some(cos_name), "id"))
        .attr("role", Expr::str(str_field(key, "role").unwrap_or("Writer")))
        .attr("tags", refs.tags());
    if bool_field(key, "enable_hmac") {
        block.map("parameters", vec![("HMAC".to_string(), Expr::Bool(true))])
    } else {
        block
    }
}

/// One section per object storage instance.
#[must_use]
pub fn cos_tf(refs: &Refs<'_>) -> Option<String> {
    render_sections(refs.tree().top_level(ResourceKind::ObjectStorage).into_iter().map(|cos| {
        let mut blocks = format_cos_instance(cos, refs);
        blocks.extend(children(cos, "buckets").into_iter().map(|bucket| format_bucket(cos, bucket, refs)));
        blocks.extend(children(cos, "keys").into_iter().map(|key| format_cos_key(cos, key, refs)));
        Section::new(format!("{} Object Storage", title_case(record_label(cos))), blocks)
    }))
}

// ============================================================================
// SECTION: Cloud Databases
// ============================================================================

fn allocation(icd: &Record, field: &str) -> Option<Expr> {
    let (amount, expr) = match icd.get(field)? {
        Value::Number(number) => (number.as_f64()?, Expr::Number(number.clone())),
        Value::String(text) => (text.trim().parse::<f64>().ok()?, Expr::raw(text.trim())),
        _ => return None,
    };
    (amount > 0.0).then_some(expr)
}

/// Formats a cloud database.
#[must_use]
pub fn format_icd(icd: &Record, refs: &Refs<'_>) -> Block {
    let name = record_label(icd);
    let memory = allocation(icd, "memory");
    let disk = allocation(icd, "disk");
    let cpu = allocation(icd, "cpu");
    let group = (memory.is_some() || disk.is_some() || cpu.is_some()).then(|| {
        let mut group =
            Block::nested("group").attr("group_id", Expr::str(str_field(icd, "group_id").unwrap_or("member")));
        if let Some(memory) = memory {
            group = group.block(Block::nested("memory").attr("allocation_mb", memory));
        }
        if let Some(disk) = disk {
            group = group.block(Block::nested("disk").attr("allocation_mb", disk));
        }
        if let Some(cpu) = cpu {
            group = group.block(Block::nested("cpu").attr("allocation_count", cpu));
        }
        group
    });
    let kms = non_empty_str(icd, "kms");
    let key = non_empty_str(icd, "encryption_key");
    resource_or_data(icd, "ibm_database", snake_case(name))
        .attr("name", Refs::data_name(icd))
        .attr("service", Expr::str(str_field(icd, "service").unwrap_or_default()))
        .attr("plan", Expr::str(str_field(icd, "plan").unwrap_or("standard")))
        .attr("location", Expr::raw("var.region"))
        .attr("resource_group_id", refs.resource_group_id(str_field(icd, "resource_group")))
        .attr_opt("version", non_empty_str(icd, "version").map(Expr::str))
        .attr_opt("key_protect_instance", kms.map(|kms| refs.kms_guid(Some(kms))))
        .attr_opt("key_protect_key", key.map(|key| refs.key_crn(kms, Some(key))))
        .attr("tags", refs.tags())
        .block_opt(group)
        .block(timeouts(&[("create", "120m"), ("update", "120m"), ("delete", "15m")]))
}

/// Cloud databases section.
#[must_use]
pub fn icd_tf(refs: &Refs<'_>) -> Option<String> {
    let blocks = refs.tree().top_level(ResourceKind::Icd).into_iter().map(|icd| format_icd(icd, refs)).collect();
    render_sections(Section::non_empty("Cloud Databases", blocks))
}

// ============================================================================
// SECTION: Event Streams
// ============================================================================

/// `"[a,b]"` from either a stored list or a comma separated string.
fn allowlist(value: &Value) -> Option<String> {
    let entries: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        Value::String(text) => {
            text.split(',').map(str::trim).filter(|entry| !entry.is_empty()).map(str::to_string).collect()
        }
        _ => Vec::new(),
    };
    if entries.is_empty() { None } else { Some(format!("[{}]", entries.join(","))) }
}

/// Formats an event streams instance.
#[must_use]
pub fn format_event_streams(es: &Record, refs: &Refs<'_>) -> Block {
    let name = record_label(es);
    let mut parameters = vec![(
        "service-endpoints".to_string(),
        Expr::str(str_field(es, "endpoints").unwrap_or("private")),
    )];
    if let Some(list) = es.get("private_ip_allowlist").and_then(allowlist) {
        parameters.push(("private_ip_allowlist".to_string(), Expr::str(list)));
    }
    if let Some(throughput) = non_empty_str(es, "throughput") {
        parameters.push(("throughput".to_string(), Expr::str(units::throughput(throughput))));
    }
    if let Some(storage) = non_empty_str(es, "storage_size") {
        parameters.push(("storage_size".to_string(), Expr::str(units::storage_gb(storage))));
    }
    Block::resource("ibm_resource_instance", format!("{}_es", snake_case(name)))
        .attr("name", refs.prefixed(name))
        .attr("service", Expr::str("messagehub"))
        .attr("plan", Expr::str(str_field(es, "plan").unwrap_or_default()))
        .attr("location", Expr::str(refs.region()))
        .attr("resource_group_id", refs.resource_group_id(str_field(es, "resource_group")))
        .map("parameters", parameters)
        .block(timeouts(&[("create", "3h"), ("update", "1h"), ("delete", "1h")]))
}

/// Event streams section.
#[must_use]
pub fn event_streams_tf(refs: &Refs<'_>) -> Option<String> {
    let blocks = refs
        .tree()
        .top_level(ResourceKind::EventStreams)
        .into_iter()
        .map(|es| format_event_streams(es, refs))
        .collect();
    render_sections(Section::non_empty("Event Streams", blocks))
}

// ============================================================================
// SECTION: Secrets Manager
// ============================================================================

/// Formats a secrets manager instance and its KMS policy.
#[must_use]
pub fn format_secrets_manager(sm: &Record, refs: &Refs<'_>) -> Vec<Block> {
    let name = record_label(sm);
    let label = format!("{}_secrets_manager", snake_case(name));
    let kms = non_empty_str(sm, "kms");
    let mut blocks = Vec::new();
    if let Some(kms) = kms {
        blocks.push(kms_policy(
            snake_case(&format!("{name} secrets manager to {kms} kms policy")),
            "secrets-manager",
            Expr::raw(format!("ibm_resource_instance.{label}.guid")),
            refs,
            Some(kms),
        ));
    }
    blocks.push(
        Block::resource("ibm_resource_instance", label)
            .attr("name", var_prefixed(name))
            .attr("location", Expr::raw("var.region"))
            .attr("plan", Expr::str(str_field(sm, "plan").unwrap_or("standard")))
            .attr("service", Expr::str("secrets-manager"))
            .attr("resource_group_id", refs.resource_group_id(str_field(sm, "resource_group")))
            .map(
                "parameters",
                vec![(
                    "kms_key".to_string(),
                    refs.key_crn(kms, non_empty_str(sm, "encryption_key")),
                )],
            )
            .attr("tags", refs.tags())
            .block(timeouts(&[("create", "1h"), ("delete", "1h")])),
    );
    blocks
}

/// Secrets manager section.
#[must_use]
pub fn secrets_manager_tf(refs: &Refs<'_>) -> Option<String> {
    let blocks = refs
        .tree()
        .top_level(ResourceKind::SecretsManager)
        .into_iter()
        .flat_map(|sm| format_secrets_manager(sm, refs))
        .collect();
    render_sections(Section::non_empty("Secrets Manager", blocks))
}

// ============================================================================
// SECTION: App ID
// ============================================================================

/// Formats an App ID instance or its data lookup.
#[must_use]
pub fn format_appid(appid: &Record, refs: &Refs<'_>) -> Block {
    let block = resource_or_data(appid, "ibm_resource_instance", snake_case(record_label(appid)))
        .attr("name", Refs::data_name(appid))
        .attr("resource_group_id", refs.resource_group_id(str_field(appid, "resource_group")))
        .attr("service", Expr::str("appid"));
    if bool_field(appid, "use_data") {
        block
    } else {
        block
            .attr("plan", Expr::str("graduated-tier"))
            .attr("location", Expr::raw("var.region"))
            .attr("tags", refs.tags())
    }
}

/// Formats a key of an App ID instance.
#[must_use]
pub fn format_appid_key(appid: &Record, key: &Record, refs: &Refs<'_>) -> Block {
    let appid_name = record_label(appid);
    let name = record_label(key);
    let data = if bool_field(appid, "use_data") { "data." } else { "" };
    Block::resource("ibm_resource_key", snake_case(&format!("{appid_name} key {name}")))
        .attr("name", var_prefixed(&format!("{appid_name}-{name}-key")))
        .attr("resource_instance_id", Expr::raw(format!("{data}ibm_resource_instance.{}.id", snake_case(appid_name))))
        .attr("role", Expr::str("Writer"))
        .attr("tags", refs.tags())
}

/// App ID section.
#[must_use]
pub fn appid_tf(refs: &Refs<'_>) -> Option<String> {
    let mut blocks = Vec::new();
    for appid in refs.tree().top_level(ResourceKind::Appid) {
        blocks.push(format_appid(appid, refs));
        blocks.extend(children(appid, "keys").into_iter().map(|key| format_appid_key(appid, key, refs)));
    }
    render_sections(Section::non_empty("App ID", blocks))
}

// ============================================================================
// SECTION: Activity Tracker
// ============================================================================

/// Formats the Activity Tracker target and route when enabled.
#[must_use]
pub fn format_atracker(atracker: &Record, refs: &Refs<'_>) -> Vec<Block> {
    if !bool_field(atracker, "enabled") {
        return Vec::new();
    }
    let name = str_field(atracker, "name").unwrap_or("atracker");
    let bucket = non_empty_str(atracker, "bucket");
    let cos = refs.bucket_owner(bucket);
    let api_key = match (refs.cos_key_owner(str_field(atracker, "cos_key")), non_empty_str(atracker, "cos_key")) {
        (Some(owner), Some(key)) => {
            Expr::raw(format!("ibm_resource_key.{}.credentials.apikey", cos_key_label(owner, key)))
        }
        _ => Expr::Unfound,
    };
    let target_label = format!("{}_cos_target", snake_case(name));
    let mut blocks = vec![
        Block::resource("ibm_atracker_target", target_label.clone())
            .attr("name", var_prefixed(&format!("{name}-cos-target")))
            .attr("target_type", Expr::str("cloud_object_storage"))
            .block(
                Block::nested("cos_endpoint")
                    .attr(
                        "endpoint",
                        Expr::str("s3.private.${var.region}.cloud-object-storage.appdomain.cloud"),
                    )
                    .attr("target_crn", refs.cos_instance(cos, "crn"))
                    .attr("bucket", refs.bucket(bucket, "bucket_name"))
                    .attr("api_key", api_key),
            ),
    ];
    if bool_field(atracker, "add_route") {
        blocks.push(
            Block::resource("ibm_atracker_route", format!("{}_route", snake_case(name)))
                .attr("name", var_prefixed(&format!("{name}-route")))
                .block(
                    Block::nested("rule")
                        .attr("target_ids", Expr::List(vec![Expr::raw(format!("ibm_atracker_target.{target_label}.id"))]))
                        .attr("locations", Expr::str_list(str_list(atracker, "locations"))),
                ),
        );
    }
    blocks
}

/// Activity Tracker section.
#[must_use]
pub fn atracker_tf(refs: &Refs<'_>) -> Option<String> {
    let blocks = refs
        .tree()
        .singleton(ResourceKind::Atracker)
        .map(|atracker| format_atracker(atracker, refs))
        .unwrap_or_default();
    render_sections(Section::non_empty("Activity Tracker", blocks))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
