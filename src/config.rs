//! Bridge Configuration
//!
//! Optional YAML file layered under the CLI flags:
//!
//! ```yaml
//! engine:
//!   address: /var/tmp/spdk.sock
//!   callTimeoutMs: 5000
//! controller:
//!   pagination:
//!     defaultPageSize: 50
//! subsystems:
//!   - name: subsystems/nqn-1
//!     spec:
//!       nqn: nqn.2022-09.io.spdk:opi1
//! ```

use crate::controlplane::ControllerConfig;
use crate::domain::model::Subsystem;
use crate::domain::resource::validate_resource_name;
use crate::engine::EngineConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
    pub engine: EngineConfig,
    pub controller: ControllerConfig,
    /// Subsystems known at startup
    pub subsystems: Vec<Subsystem>,
}

impl BridgeConfig {
    /// Parse a YAML document
    pub fn from_yaml(document: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(document)?;
        config.check()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&document).map_err(|e| {
            Error::Configuration(format!("{}: {}", path.display(), e))
        })?;
        info!(
            "Loaded configuration from {} ({} subsystems)",
            path.display(),
            config.subsystems.len()
        );
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        self.controller.pagination.check()?;

        let mut seen = HashSet::new();
        for subsystem in &self.subsystems {
            validate_resource_name(&subsystem.name)
                .map_err(|e| Error::Configuration(e.to_string()))?;
            if subsystem.spec.nqn.is_empty() {
                return Err(Error::Configuration(format!(
                    "subsystem {} has no nqn",
                    subsystem.name
                )));
            }
            if !seen.insert(subsystem.name.as_str()) {
                return Err(Error::Configuration(format!(
                    "subsystem {} listed twice",
                    subsystem.name
                )));
            }
        }
        Ok(())
    }
}
