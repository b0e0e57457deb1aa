//! Registry Events
//!
//! Events emitted by the namespace registry for external consumers to react
//! to namespace lifecycle changes.

use serde::{Deserialize, Serialize};

/// Events emitted by the namespace registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryEvent {
    /// A namespace was granted
    NamespaceRegistered {
        name: String,
        subsystem_id: String,
        host_nsid: i32,
    },

    /// An existing entry was overwritten
    NamespaceReplaced { name: String },

    /// A namespace was removed
    NamespaceRemoved { name: String },
}

impl RegistryEvent {
    /// Get the namespace name associated with this event
    pub fn name(&self) -> &str {
        match self {
            RegistryEvent::NamespaceRegistered { name, .. } => name,
            RegistryEvent::NamespaceReplaced { name } => name,
            RegistryEvent::NamespaceRemoved { name } => name,
        }
    }
}

impl std::fmt::Display for RegistryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryEvent::NamespaceRegistered {
                name,
                subsystem_id,
                host_nsid,
            } => write!(f, "registered {} (nsid {} on {})", name, host_nsid, subsystem_id),
            RegistryEvent::NamespaceReplaced { name } => write!(f, "replaced {}", name),
            RegistryEvent::NamespaceRemoved { name } => write!(f, "removed {}", name),
        }
    }
}
