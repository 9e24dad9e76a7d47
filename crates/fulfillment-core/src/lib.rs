//! Core engine of the order fulfillment system.
//!
//! This crate drives orders from creation by a seller through preparation by
//! stock handlers to delivery, coordinating stock reservations, the
//! confirmation window, the audit trail and notifications. The engine is
//! assembled by [`EngineBuilder`] from pluggable storage and notification
//! implementations.

pub mod audit;
pub mod builder;
pub mod catalog;
pub mod clock;
pub mod engine;
pub mod lifecycle;
pub mod monitoring;
pub mod order_number;
pub mod state;
pub mod stock;

pub use builder::{BuilderError, EngineBuilder, EngineFactories};
pub use clock::{ManualClock, SystemClock, TimeSource};
pub use engine::{event_bus::EventBus, EngineError, FulfillmentEngine};
pub use lifecycle::{LifecycleError, OrderLifecycle, TransitionOutcome};
pub use monitoring::{ConfirmationSweeper, SweepSummary};
pub use state::{ConfirmationWindow, Transition};
