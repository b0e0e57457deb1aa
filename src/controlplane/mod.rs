//! Control Plane Module
//!
//! The namespace controller, its metrics, and the REST API in front of it.

pub mod api;
pub mod controller;
pub mod metrics;

pub use api::*;
pub use controller::*;
pub use metrics::*;
