//! Domain layer - Core resource model and port definitions
//!
//! This module defines the caller-visible resource model, the naming policy,
//! and the core traits (ports) that adapters implement, following hexagonal
//! architecture principles.

pub mod model;
pub mod ports;
pub mod resource;

pub use model::*;
pub use ports::*;
