//! Audit trail types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role snapshot recorded for transitions performed by the engine itself.
pub const SYSTEM_ROLE: &str = "system";

/// Kind of lifecycle transition recorded in the audit trail.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
	Created,
	Modified,
	Confirmed,
	Cancelled,
	Preparing,
	Ready,
	Assigned,
	Delivered,
	DeliveryCancelled,
}

impl AuditAction {
	pub fn as_str(&self) -> &'static str {
		match self {
			AuditAction::Created => "created",
			AuditAction::Modified => "modified",
			AuditAction::Confirmed => "confirmed",
			AuditAction::Cancelled => "cancelled",
			AuditAction::Preparing => "preparing",
			AuditAction::Ready => "ready",
			AuditAction::Assigned => "assigned",
			AuditAction::Delivered => "delivered",
			AuditAction::DeliveryCancelled => "delivery_cancelled",
		}
	}
}

impl fmt::Display for AuditAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One immutable entry of an order's history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEvent {
	/// Position in the order's history, starting at 1.
	pub sequence: u64,
	pub order_id: String,
	pub action: AuditAction,
	/// Acting user; `None` for engine-driven transitions.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub actor_id: Option<String>,
	/// Role of the actor when the event happened.
	pub actor_role: String,
	pub description: String,
	pub created_at: DateTime<Utc>,
}
