//! Common types module for the order fulfillment system.
//!
//! This module defines the data types shared by every fulfillment component:
//! orders and their items, the roles and capabilities of acting users,
//! product and user records owned by external collaborators, audit events,
//! notification requests and the events published on the engine bus.

/// Request payloads and read models exposed by the engine.
pub mod api;
/// Audit trail types recorded for every successful transition.
pub mod audit;
/// Event types for inter-component communication.
pub mod events;
/// Notification requests emitted by lifecycle transitions.
pub mod notification;
/// Order entity, items and statuses.
pub mod order;
/// Product records read (and stock-written) by the core.
pub mod product;
/// Registry trait for named, config-driven implementations.
pub mod registry;
/// Storage namespaces for persisted records.
pub mod storage;
/// Users, roles, capabilities and acting principals.
pub mod user;
/// Utility functions for display formatting.
pub mod utils;
/// Configuration validation types for implementation-specific tables.
pub mod validation;

// Re-export all types for convenient access
pub use api::*;
pub use audit::*;
pub use events::*;
pub use notification::*;
pub use order::*;
pub use product::*;
pub use registry::*;
pub use storage::*;
pub use user::*;
pub use utils::truncate_id;
pub use validation::*;
