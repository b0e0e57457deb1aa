//! Storage Engine Adapters
//!
//! Provides gateways to the out-of-process storage engine:
//! - JSON-RPC: SPDK-style JSON-RPC 2.0 over a unix socket or TCP
//! - Memory: in-process engine for standalone mode and tests

pub mod jsonrpc;
pub mod memory;

pub use jsonrpc::*;
pub use memory::*;

use crate::domain::ports::EngineGateway;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the engine gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Engine address: a socket path, `unix:<path>`, `tcp://host:port` or `host:port`
    pub address: String,
    /// Upper bound for a single engine call, in milliseconds
    pub call_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            address: "/var/tmp/spdk.sock".to_string(),
            call_timeout_ms: 10_000,
        }
    }
}

impl EngineConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

// =============================================================================
// Engine Address
// =============================================================================

/// Where the engine listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineAddress {
    Unix(PathBuf),
    Tcp(String),
}

impl EngineAddress {
    pub fn parse(address: &str) -> Result<Self> {
        let address = address.trim();
        if address.is_empty() {
            return Err(Error::Configuration("empty engine address".into()));
        }
        if let Some(path) = address.strip_prefix("unix:") {
            return Ok(EngineAddress::Unix(PathBuf::from(path)));
        }
        if let Some(host) = address.strip_prefix("tcp://") {
            return Ok(EngineAddress::Tcp(host.to_string()));
        }
        if address.starts_with('/') || address.starts_with('.') {
            return Ok(EngineAddress::Unix(PathBuf::from(address)));
        }
        if address.contains(':') {
            return Ok(EngineAddress::Tcp(address.to_string()));
        }
        Err(Error::Configuration(format!(
            "unrecognized engine address: {}",
            address
        )))
    }
}

impl std::fmt::Display for EngineAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineAddress::Unix(path) => write!(f, "unix:{}", path.display()),
            EngineAddress::Tcp(addr) => write!(f, "tcp://{}", addr),
        }
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Factory for creating engine gateways
pub struct EngineFactory;

impl EngineFactory {
    /// Create an engine gateway by name
    pub fn create(name: &str, config: &EngineConfig) -> Result<Arc<dyn EngineGateway>> {
        match name.to_lowercase().as_str() {
            "jsonrpc" | "spdk" => Ok(Arc::new(JsonRpcGateway::new(config)?)),
            "memory" | "standalone" => Ok(Arc::new(MemoryEngine::new())),
            _ => Err(Error::Configuration(format!("unknown engine: {}", name))),
        }
    }
}
