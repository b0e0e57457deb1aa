//! Subsystem Catalog
//!
//! Concurrent directory of subsystems keyed by resource name. Populated at
//! startup from configuration; the namespace controller only reads it.

use crate::domain::model::Subsystem;
use crate::domain::ports::SubsystemDirectory;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

/// Directory of known subsystems
#[derive(Debug, Default)]
pub struct SubsystemCatalog {
    subsystems: DashMap<String, Subsystem>,
}

impl SubsystemCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Build a catalog from a list of subsystems
    pub fn from_subsystems(subsystems: impl IntoIterator<Item = Subsystem>) -> Arc<Self> {
        let catalog = Self::default();
        for subsystem in subsystems {
            catalog.insert(subsystem);
        }
        Arc::new(catalog)
    }

    /// Add or replace a subsystem
    pub fn insert(&self, subsystem: Subsystem) -> Option<Subsystem> {
        info!("Subsystem {} -> {}", subsystem.name, subsystem.spec.nqn);
        self.subsystems.insert(subsystem.name.clone(), subsystem)
    }

    /// Remove a subsystem
    pub fn remove(&self, name: &str) -> Option<Subsystem> {
        self.subsystems.remove(name).map(|(_, subsystem)| subsystem)
    }

    pub fn len(&self) -> usize {
        self.subsystems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subsystems.is_empty()
    }
}

impl SubsystemDirectory for SubsystemCatalog {
    fn get(&self, name: &str) -> Option<Subsystem> {
        self.subsystems.get(name).map(|entry| entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup() {
        let catalog = SubsystemCatalog::from_subsystems([
            Subsystem::new("subsystems/nqn-1", "nqn.2022-09.io.spdk:opi1"),
            Subsystem::new("subsystems/nqn-2", "nqn.2022-09.io.spdk:opi2"),
        ]);

        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.get("subsystems/nqn-1").unwrap().spec.nqn,
            "nqn.2022-09.io.spdk:opi1"
        );
        assert!(catalog.get("subsystems/nqn-9").is_none());

        catalog.remove("subsystems/nqn-1");
        assert!(catalog.get("subsystems/nqn-1").is_none());
    }
}
