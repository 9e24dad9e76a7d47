//! Event types for inter-component communication.
//!
//! Events are published on the engine's bus after a transition commits, so
//! observers only ever see state that is already durable.

use crate::{AuditAction, OrderStatus};
use serde::{Deserialize, Serialize};

/// Main event type encompassing all engine events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FulfillmentEvent {
	/// Events from the order lifecycle.
	Order(OrderEvent),
	/// Events from the confirmation sweeper.
	Sweep(SweepEvent),
}

/// Events related to order transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderEvent {
	/// A transition was committed.
	Transitioned {
		order_id: String,
		order_number: String,
		action: AuditAction,
		status: OrderStatus,
	},
}

/// Events related to periodic sweeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SweepEvent {
	/// A pass over the pending orders finished.
	Completed { examined: usize, confirmed: usize },
}
