//! State management for orders.
//!
//! This module holds the transition table, the confirmation window
//! computations, order persistence and the lock table that serializes
//! transitions on the same records.

pub mod locks;
pub mod order;
pub mod transitions;
pub mod window;

pub use locks::{LockGuard, LockTable};
pub use order::OrderStore;
pub use transitions::Transition;
pub use window::{ConfirmationWindow, WindowState};
