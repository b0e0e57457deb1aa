//! In-Memory Engine
//!
//! Keeps attached namespaces and IO counters in process. Used by standalone
//! mode and by tests that need to observe which commands were issued.

use crate::domain::ports::{
    commands, AttachParams, DetachParams, EngineControllerStats, EngineDeviceStats, EngineGateway,
    EngineIoStats, EngineNamespace, EngineNamespaceList, ListParams,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Engine that tracks state in memory
#[derive(Default)]
pub struct MemoryEngine {
    /// Attached namespaces per subsystem NQN, in attach order
    subsystems: RwLock<BTreeMap<String, Vec<EngineNamespace>>>,
    /// (read_ios, write_ios) per device name
    io_counters: RwLock<BTreeMap<String, (i64, i64)>>,
    /// Commands issued, by method name
    calls: DashMap<String, u64>,
    /// Commands that will be refused
    refused: Mutex<HashSet<String>>,
}

impl MemoryEngine {
    /// Create a new in-memory engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call of `command` return a rejection
    pub fn refuse(&self, command: &str) {
        self.refused.lock().insert(command.to_string());
    }

    /// Stop refusing all commands
    pub fn accept_all(&self) {
        self.refused.lock().clear();
    }

    /// Number of times `command` was issued
    pub fn call_count(&self, command: &str) -> u64 {
        self.calls.get(command).map(|c| *c).unwrap_or(0)
    }

    /// Place a namespace directly into engine state, bypassing attach
    pub async fn insert_namespace(&self, subnqn: &str, namespace: EngineNamespace) {
        self.subsystems
            .write()
            .await
            .entry(subnqn.to_string())
            .or_default()
            .push(namespace);
    }

    /// Remove a namespace directly from engine state, bypassing detach
    pub async fn remove_namespace(&self, subnqn: &str, nsid: i32) {
        if let Some(namespaces) = self.subsystems.write().await.get_mut(subnqn) {
            namespaces.retain(|ns| ns.nsid != nsid);
        }
    }

    /// Add IO to the counters of a device
    pub async fn record_io(&self, bdev: &str, reads: i64, writes: i64) {
        let mut counters = self.io_counters.write().await;
        let entry = counters.entry(bdev.to_string()).or_insert((0, 0));
        entry.0 += reads;
        entry.1 += writes;
    }

    fn begin(&self, command: &str) -> Result<()> {
        *self.calls.entry(command.to_string()).or_insert(0) += 1;
        if self.refused.lock().contains(command) {
            return Err(rejected(command, "refused"));
        }
        Ok(())
    }
}

fn rejected(command: &str, reason: &str) -> Error {
    Error::EngineRejected {
        command: command.to_string(),
        reason: reason.to_string(),
    }
}

#[async_trait]
impl EngineGateway for MemoryEngine {
    async fn attach(&self, params: AttachParams) -> Result<()> {
        self.begin(commands::ATTACH)?;

        let mut subsystems = self.subsystems.write().await;
        let namespaces = subsystems.entry(params.subnqn.clone()).or_default();
        if namespaces.iter().any(|ns| ns.nsid == params.nsid) {
            return Err(rejected(commands::ATTACH, "nsid already attached"));
        }

        info!(
            "Attaching {} as nsid {} to {}",
            params.bdev, params.nsid, params.subnqn
        );
        namespaces.push(EngineNamespace {
            nsid: params.nsid,
            bdev: params.bdev,
            bdev_type: params.bdev_type,
        });
        Ok(())
    }

    async fn detach(&self, params: DetachParams) -> Result<()> {
        self.begin(commands::DETACH)?;

        let mut subsystems = self.subsystems.write().await;
        let namespaces = subsystems
            .get_mut(&params.subnqn)
            .ok_or_else(|| rejected(commands::DETACH, "unknown subsystem"))?;
        let before = namespaces.len();
        namespaces.retain(|ns| ns.nsid != params.nsid);
        if namespaces.len() == before {
            return Err(rejected(commands::DETACH, "nsid not attached"));
        }

        info!("Detached nsid {} from {}", params.nsid, params.subnqn);
        Ok(())
    }

    async fn list(&self, params: ListParams) -> Result<EngineNamespaceList> {
        self.begin(commands::LIST)?;

        let namespaces = self
            .subsystems
            .read()
            .await
            .get(&params.subnqn)
            .cloned()
            .unwrap_or_default();
        debug!("{} namespaces on {}", namespaces.len(), params.subnqn);

        Ok(EngineNamespaceList {
            name: params.subnqn,
            cntlid: params.cntlid,
            namespaces,
        })
    }

    async fn iostat(&self) -> Result<EngineIoStats> {
        self.begin(commands::IOSTAT)?;

        let subsystems = self.subsystems.read().await;
        let counters = self.io_counters.read().await;
        let controllers = subsystems
            .iter()
            .map(|(subnqn, namespaces)| EngineControllerStats {
                name: subnqn.clone(),
                bdevs: namespaces
                    .iter()
                    .map(|ns| {
                        let (read_ios, write_ios) =
                            counters.get(&ns.bdev).copied().unwrap_or((0, 0));
                        EngineDeviceStats {
                            bdev_name: ns.bdev.clone(),
                            read_ios,
                            write_ios,
                            ..Default::default()
                        }
                    })
                    .collect(),
            })
            .collect();

        Ok(EngineIoStats { controllers })
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn engine_name(&self) -> &str {
        "memory"
    }
}
