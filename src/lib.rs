//! NVMe Frontend Bridge
//!
//! Control plane for NVMe namespaces backed by an out-of-process storage
//! engine. Callers manage namespaces through a resource API; the bridge
//! keeps a registry of what it created and drives the engine over
//! SPDK-style JSON-RPC.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    REST API (axum)                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │                  Namespace Controller                        │
//! │   Create / Delete / Update / List / Get / Stats              │
//! ├───────────────┬──────────────────┬───────────────────────────┤
//! │  Namespace    │   Subsystem      │   Pagination              │
//! │  Registry     │   Catalog        │   Cursor Store            │
//! │  (sharded)    │                  │                           │
//! ├───────────────┴──────────────────┴───────────────────────────┤
//! │                    Engine Gateway                            │
//! │        JSON-RPC (unix / tcp)   │   Memory (standalone)       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`controlplane`]: Namespace controller, metrics and REST API
//! - [`registry`]: Namespace registry, locks, pagination and subsystems
//! - [`engine`]: Engine gateway implementations
//! - [`domain`]: Resource model, naming policy and ports
//! - [`config`]: YAML configuration
//! - [`error`]: Error types and handling

pub mod config;
pub mod controlplane;
pub mod domain;
pub mod engine;
pub mod error;
pub mod registry;

// Re-export commonly used types
pub use config::BridgeConfig;

pub use controlplane::{
    ApiServer, ApiServerConfig, ControllerConfig, ControllerMetrics, NamespaceController,
    RestRouter,
};

pub use domain::model::{
    Namespace, NamespaceSpec, NamespaceStatus, PciOperState, PciState, Subsystem, SubsystemSpec,
    VolumeStats,
};

pub use domain::ports::{EngineGateway, NamespaceStore, SubsystemDirectory};

pub use engine::{EngineConfig, EngineFactory, JsonRpcGateway, MemoryEngine};

pub use error::{Error, ErrorKind, Result};

pub use registry::{
    NamespaceRegistry, PaginationConfig, PaginationStore, RegistryEvent, RegistryStatsSnapshot,
    SubsystemCatalog,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
