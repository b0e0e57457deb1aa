//! Registry Module
//!
//! Shared controller state: the sharded namespace registry, per-name locks,
//! the pagination cursor store, and the subsystem catalog.

pub mod events;
pub mod locks;
pub mod namespace_registry;
pub mod pagination;
pub mod subsystems;

pub use events::*;
pub use locks::*;
pub use namespace_registry::*;
pub use pagination::*;
pub use subsystems::*;
