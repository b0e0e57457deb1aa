//! Domain Ports - Core trait definitions for the bridge
//!
//! These traits define the boundaries between the namespace controller and
//! the systems it depends on. Adapters implement these traits to provide
//! concrete functionality.

use crate::domain::model::{Namespace, Subsystem};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// Engine Commands
// =============================================================================

/// Engine method names
pub mod commands {
    pub const ATTACH: &str = "controller_nvme_namespace_attach";
    pub const DETACH: &str = "controller_nvme_namespace_detach";
    pub const LIST: &str = "controller_nvme_namespace_list";
    pub const IOSTAT: &str = "controller_nvme_get_iostat";
}

/// Controller slot used for every command
pub const DEFAULT_CONTROLLER_ID: i32 = 0;

/// Device type passed with attach
pub const DEFAULT_BDEV_TYPE: &str = "spdk";

/// Parameters for attaching a device as a namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachParams {
    pub bdev_type: String,
    pub bdev: String,
    pub nsid: i32,
    pub subnqn: String,
    pub cntlid: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uuid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub nguid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub eui64: String,
}

/// Parameters for detaching a namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachParams {
    pub nsid: i32,
    pub subnqn: String,
    pub cntlid: i32,
}

/// Parameters for listing namespaces of a subsystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    pub subnqn: String,
    pub cntlid: i32,
}

/// Namespace as reported by the engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineNamespace {
    pub nsid: i32,
    #[serde(default)]
    pub bdev: String,
    #[serde(default)]
    pub bdev_type: String,
}

/// Result of a list command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineNamespaceList {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cntlid: i32,
    #[serde(default)]
    pub namespaces: Vec<EngineNamespace>,
}

/// IO counters for one device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineDeviceStats {
    pub bdev_name: String,
    #[serde(default)]
    pub read_ios: i64,
    #[serde(default)]
    pub write_ios: i64,
    #[serde(default)]
    pub read_bytes: i64,
    #[serde(default)]
    pub write_bytes: i64,
}

/// IO counters for one controller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineControllerStats {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bdevs: Vec<EngineDeviceStats>,
}

/// Result of an iostat command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineIoStats {
    #[serde(default)]
    pub controllers: Vec<EngineControllerStats>,
}

impl EngineIoStats {
    /// Find a device by name across all controllers
    pub fn find_device(&self, bdev_name: &str) -> Option<&EngineDeviceStats> {
        self.controllers
            .iter()
            .flat_map(|c| c.bdevs.iter())
            .find(|d| d.bdev_name == bdev_name)
    }
}

// =============================================================================
// Engine Gateway Port
// =============================================================================

/// Port for storage engine commands.
///
/// Implementations distinguish transport failures
/// ([`crate::Error::EngineTransport`], [`crate::Error::EngineTimeout`]) from
/// explicit refusals ([`crate::Error::EngineRejected`]).
#[async_trait]
pub trait EngineGateway: Send + Sync {
    /// Attach a device to a subsystem as a namespace
    async fn attach(&self, params: AttachParams) -> Result<()>;

    /// Detach a namespace from a subsystem
    async fn detach(&self, params: DetachParams) -> Result<()>;

    /// List namespaces attached to a subsystem
    async fn list(&self, params: ListParams) -> Result<EngineNamespaceList>;

    /// Fetch IO counters for every controller
    async fn iostat(&self) -> Result<EngineIoStats>;

    /// Check if the engine is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Get engine name
    fn engine_name(&self) -> &str;
}

// =============================================================================
// Subsystem Directory Port
// =============================================================================

/// Read-only lookup of subsystems by resource name
pub trait SubsystemDirectory: Send + Sync {
    fn get(&self, name: &str) -> Option<Subsystem>;
}

// =============================================================================
// Namespace Store Port
// =============================================================================

/// Storage for namespaces granted by the controller
pub trait NamespaceStore: Send + Sync {
    /// Get a namespace by resource name
    fn get(&self, name: &str) -> Option<Namespace>;

    /// Insert or replace a namespace, returning the previous entry
    fn put(&self, namespace: Namespace) -> Option<Namespace>;

    /// Remove a namespace, returning it if present
    fn delete(&self, name: &str) -> Option<Namespace>;

    /// Number of stored namespaces
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type EngineGatewayRef = Arc<dyn EngineGateway>;
pub type SubsystemDirectoryRef = Arc<dyn SubsystemDirectory>;
pub type NamespaceStoreRef = Arc<dyn NamespaceStore>;
