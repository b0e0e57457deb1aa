//! Resource identifiers and names
//!
//! Naming policy for namespaces: IDs are either system generated (UUID v4) or
//! caller supplied, and always resolve to `namespaces/{id}`.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Collection segment for namespace resource names
pub const NAMESPACE_COLLECTION: &str = "namespaces";

/// Field paths of [`crate::domain::model::Namespace`] accepted in update masks
pub const NAMESPACE_FIELD_PATHS: &[&str] = &[
    "name",
    "spec",
    "spec.subsystem_id",
    "spec.volume_id",
    "spec.host_nsid",
    "spec.uuid",
    "spec.nguid",
    "spec.eui64",
    "status",
    "status.pci_state",
    "status.pci_oper_state",
];

fn user_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z]([a-z0-9-]{0,61}[a-z0-9])?$").expect("static pattern compiles")
    })
}

fn name_segment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._~:@!$&'()*+,;=%-]+$").expect("static pattern compiles")
    })
}

/// Generate a new system-assigned resource ID
pub fn new_system_generated_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Check a caller-supplied resource ID.
///
/// IDs are 1-63 characters, start with a lowercase letter, contain only
/// lowercase letters, digits and hyphens, and do not end with a hyphen.
/// UUIDs are reserved for system-generated IDs.
pub fn validate_user_settable_id(id: &str) -> Result<()> {
    if uuid::Uuid::parse_str(id).is_ok() {
        return Err(Error::InvalidResourceId {
            id: id.to_string(),
            reason: "UUIDs are reserved for system-generated IDs".into(),
        });
    }
    if !user_id_pattern().is_match(id) {
        return Err(Error::InvalidResourceId {
            id: id.to_string(),
            reason: "must match ^[a-z]([a-z0-9-]{0,61}[a-z0-9])?$".into(),
        });
    }
    Ok(())
}

/// Check that a resource name is a `/`-separated path of non-empty segments
pub fn validate_resource_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidResourceName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("empty name"));
    }
    // Full resource names carry a leading service authority: //host/path
    let path = match name.strip_prefix("//") {
        Some(rest) => match rest.split_once('/') {
            Some((authority, path)) if !authority.is_empty() => path,
            _ => return Err(invalid("missing service authority")),
        },
        None => name,
    };
    for segment in path.split('/') {
        if segment.is_empty() {
            return Err(invalid("empty segment"));
        }
        if !name_segment_pattern().is_match(segment) {
            return Err(invalid("invalid character in segment"));
        }
    }
    Ok(())
}

/// Map a resource ID to its namespace resource name
pub fn namespace_name(id: &str) -> String {
    format!("{}/{}", NAMESPACE_COLLECTION, id)
}

/// Last segment of a resource name
pub fn resource_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Engine device name for a volume reference (`volumes/v1` -> `v1`)
pub fn volume_device_name(volume_ref: &str) -> &str {
    resource_id(volume_ref)
}

/// Check update-mask paths against the namespace field set.
///
/// `*` is accepted only as the sole path.
pub fn validate_update_mask(paths: &[String]) -> Result<()> {
    if paths.iter().any(|p| p == "*") {
        if paths.len() == 1 {
            return Ok(());
        }
        return Err(Error::InvalidUpdateMask {
            reason: "'*' must be the only path".into(),
        });
    }
    for path in paths {
        if !NAMESPACE_FIELD_PATHS.contains(&path.as_str()) {
            return Err(Error::InvalidUpdateMask {
                reason: format!("unknown field path '{}'", path),
            });
        }
    }
    Ok(())
}
