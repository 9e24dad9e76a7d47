//! Background evaluation of orders over time.
//!
//! The confirmation sweeper promotes pending orders once their confirmation
//! window has elapsed.

pub mod sweeper;

pub use sweeper::{ConfirmationSweeper, SweepSummary};
