//! API Module
//!
//! REST API for namespace management, registry statistics and metrics.

pub mod rest;
pub mod server;

pub use rest::*;
pub use server::*;
