//! Resource model for NVMe namespaces and subsystems
//!
//! These are the caller-visible shapes. Engine-side shapes live in
//! [`crate::domain::ports`].

use serde::{Deserialize, Serialize};
use validator::Validate;

// =============================================================================
// Attach State
// =============================================================================

/// Coarse PCI attach state of a namespace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PciState {
    #[default]
    Unspecified,
    Disabled,
    Enabled,
    Deleting,
}

impl PciState {
    /// Numeric wire code
    pub fn code(&self) -> i32 {
        match self {
            PciState::Unspecified => 0,
            PciState::Disabled => 1,
            PciState::Enabled => 2,
            PciState::Deleting => 3,
        }
    }
}

/// Operational PCI state of a namespace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PciOperState {
    #[default]
    Unspecified,
    Online,
    Offline,
}

impl PciOperState {
    /// Numeric wire code
    pub fn code(&self) -> i32 {
        match self {
            PciOperState::Unspecified => 0,
            PciOperState::Online => 1,
            PciOperState::Offline => 2,
        }
    }
}

// =============================================================================
// Namespace
// =============================================================================

/// A storage volume attached to a subsystem, addressable by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Namespace {
    /// Resource name (`namespaces/{id}`), assigned by the controller
    #[serde(default)]
    pub name: String,
    #[validate(nested)]
    #[serde(default)]
    pub spec: NamespaceSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NamespaceStatus>,
}

/// Desired state of a namespace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSpec {
    /// Parent subsystem resource name, immutable after creation
    #[validate(length(min = 1, message = "spec.subsystem_id is required"))]
    #[serde(default)]
    pub subsystem_id: String,
    /// Backing volume resource name
    #[validate(length(min = 1, message = "spec.volume_id is required"))]
    #[serde(default)]
    pub volume_id: String,
    /// Namespace ID as seen by the host
    #[serde(default)]
    pub host_nsid: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default)]
    pub nguid: String,
    #[serde(default)]
    pub eui64: i64,
}

/// Observed state of a namespace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceStatus {
    pub pci_state: PciState,
    pub pci_oper_state: PciOperState,
}

impl NamespaceStatus {
    /// Status stamped after a successful engine attach
    pub fn attached() -> Self {
        Self {
            pci_state: PciState::Enabled,
            pci_oper_state: PciOperState::Online,
        }
    }
}

// =============================================================================
// Subsystem
// =============================================================================

/// NVMe subsystem that namespaces attach under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subsystem {
    /// Resource name (e.g. `subsystems/nqn-1`)
    pub name: String,
    pub spec: SubsystemSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsystemSpec {
    /// NVMe qualified name used by the engine
    pub nqn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_number: Option<String>,
}

impl Subsystem {
    pub fn new(name: impl Into<String>, nqn: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spec: SubsystemSpec {
                nqn: nqn.into(),
                serial_number: None,
                model_number: None,
            },
        }
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Per-volume IO counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeStats {
    pub read_ops_count: i64,
    pub write_ops_count: i64,
}

// =============================================================================
// Requests / Responses
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateNamespaceRequest {
    #[validate(nested)]
    pub namespace: Namespace,
    /// Caller-chosen ID; a system ID is generated when absent
    #[serde(default)]
    pub namespace_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeleteNamespaceRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default)]
    pub allow_missing: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNamespaceRequest {
    #[validate(nested)]
    pub namespace: Namespace,
    /// Field paths to update; empty means every mutable field
    #[serde(default)]
    pub update_mask: Vec<String>,
    #[serde(default)]
    pub allow_missing: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListNamespacesRequest {
    #[validate(length(min = 1, message = "parent is required"))]
    pub parent: String,
    #[serde(default)]
    pub page_size: i32,
    #[serde(default)]
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNamespacesResponse {
    pub namespaces: Vec<Namespace>,
    /// Empty when there are no further pages
    #[serde(default)]
    pub next_page_token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GetNamespaceRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceStatsRequest {
    #[validate(length(min = 1, message = "namespace_id is required"))]
    pub namespace_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceStatsResponse {
    pub id: String,
    pub stats: VolumeStats,
}
