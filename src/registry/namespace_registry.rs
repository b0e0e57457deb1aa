//! Sharded Namespace Registry
//!
//! A 256-way sharded registry of the namespaces this controller has granted.
//! The registry is the source of truth for names; the engine stays the source
//! of truth for device state.

use super::RegistryEvent;
use crate::domain::model::Namespace;
use crate::domain::ports::NamespaceStore;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

// =============================================================================
// Constants
// =============================================================================

/// Number of shards in the registry (256 for good distribution)
pub const REGISTRY_SHARD_COUNT: usize = 256;

/// Capacity of the event channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

// =============================================================================
// Namespace Name
// =============================================================================

/// Resource name of a namespace (`namespaces/{id}`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespaceName(pub String);

impl NamespaceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the shard index for this name
    #[inline]
    pub fn shard_index(&self) -> usize {
        shard_for(&self.0, REGISTRY_SHARD_COUNT)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NamespaceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NamespaceName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NamespaceName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Stable shard index of a key
pub(crate) fn shard_for(key: &str, shard_count: usize) -> usize {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() as usize) % shard_count
}

// =============================================================================
// Registry Shard
// =============================================================================

struct RegistryShard {
    namespaces: RwLock<HashMap<NamespaceName, Namespace>>,
}

impl RegistryShard {
    fn new() -> Self {
        Self {
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    fn get(&self, name: &NamespaceName) -> Option<Namespace> {
        self.namespaces.read().get(name).cloned()
    }

    fn put(&self, name: NamespaceName, namespace: Namespace) -> Option<Namespace> {
        self.namespaces.write().insert(name, namespace)
    }

    fn remove(&self, name: &NamespaceName) -> Option<Namespace> {
        self.namespaces.write().remove(name)
    }

    fn names(&self) -> Vec<NamespaceName> {
        self.namespaces.read().keys().cloned().collect()
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Registry-wide counters
#[derive(Debug, Default)]
struct RegistryStats {
    total_namespaces: AtomicU64,
    registrations: AtomicU64,
    replacements: AtomicU64,
    removals: AtomicU64,
}

/// Snapshot of registry statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStatsSnapshot {
    pub total_namespaces: u64,
    pub registrations: u64,
    pub replacements: u64,
    pub removals: u64,
}

// =============================================================================
// Namespace Registry
// =============================================================================

/// Registry of granted namespaces with 256-way sharding
pub struct NamespaceRegistry {
    shards: Box<[RegistryShard]>,
    stats: RegistryStats,
    event_sender: broadcast::Sender<RegistryEvent>,
}

impl std::fmt::Debug for NamespaceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceRegistry")
            .field("total_namespaces", &self.stats.total_namespaces.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        let (event_sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shards: (0..REGISTRY_SHARD_COUNT).map(|_| RegistryShard::new()).collect(),
            stats: RegistryStats::default(),
            event_sender,
        }
    }
}

impl NamespaceRegistry {
    /// Create a new namespace registry
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Get an event receiver
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.event_sender.subscribe()
    }

    fn shard(&self, name: &NamespaceName) -> &RegistryShard {
        &self.shards[name.shard_index()]
    }

    /// Check if a namespace exists
    pub fn contains(&self, name: &str) -> bool {
        NamespaceStore::get(self, name).is_some()
    }

    /// Get all namespace names, sorted
    pub fn names(&self) -> Vec<NamespaceName> {
        let mut names: Vec<NamespaceName> =
            self.shards.iter().flat_map(|shard| shard.names()).collect();
        names.sort();
        names
    }

    /// Get registry statistics
    pub fn stats(&self) -> RegistryStatsSnapshot {
        RegistryStatsSnapshot {
            total_namespaces: self.stats.total_namespaces.load(Ordering::Relaxed),
            registrations: self.stats.registrations.load(Ordering::Relaxed),
            replacements: self.stats.replacements.load(Ordering::Relaxed),
            removals: self.stats.removals.load(Ordering::Relaxed),
        }
    }
}

impl NamespaceStore for NamespaceRegistry {
    fn get(&self, name: &str) -> Option<Namespace> {
        let name = NamespaceName::from(name);
        self.shard(&name).get(&name)
    }

    fn put(&self, namespace: Namespace) -> Option<Namespace> {
        let name = NamespaceName::from(namespace.name.clone());
        let subsystem_id = namespace.spec.subsystem_id.clone();
        let host_nsid = namespace.spec.host_nsid;

        let previous = self.shard(&name).put(name.clone(), namespace);

        let event = if previous.is_some() {
            self.stats.replacements.fetch_add(1, Ordering::Relaxed);
            RegistryEvent::NamespaceReplaced {
                name: name.to_string(),
            }
        } else {
            self.stats.total_namespaces.fetch_add(1, Ordering::Relaxed);
            self.stats.registrations.fetch_add(1, Ordering::Relaxed);
            RegistryEvent::NamespaceRegistered {
                name: name.to_string(),
                subsystem_id,
                host_nsid,
            }
        };
        debug!("Registry: {}", event);
        let _ = self.event_sender.send(event);

        previous
    }

    fn delete(&self, name: &str) -> Option<Namespace> {
        let name = NamespaceName::from(name);
        let removed = self.shard(&name).remove(&name)?;

        self.stats.total_namespaces.fetch_sub(1, Ordering::Relaxed);
        self.stats.removals.fetch_add(1, Ordering::Relaxed);
        let event = RegistryEvent::NamespaceRemoved {
            name: name.to_string(),
        };
        debug!("Registry: {}", event);
        let _ = self.event_sender.send(event);

        Some(removed)
    }

    fn len(&self) -> usize {
        self.stats.total_namespaces.load(Ordering::Relaxed) as usize
    }
}
