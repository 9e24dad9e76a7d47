//! Notification requests produced by lifecycle transitions.
//!
//! Requests are handed to the notification collaborator after a transition
//! commits. Delivery, storage and read tracking are its concern.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
	OrderConfirmed,
	OrderAssigned,
	OrderDelivered,
	OrderCancelled,
}

impl fmt::Display for NotificationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			NotificationKind::OrderConfirmed => "order_confirmed",
			NotificationKind::OrderAssigned => "order_assigned",
			NotificationKind::OrderDelivered => "order_delivered",
			NotificationKind::OrderCancelled => "order_cancelled",
		};
		f.write_str(s)
	}
}

/// A message for one recipient, optionally linked to an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationRequest {
	pub recipient_user_id: String,
	pub kind: NotificationKind,
	pub title: String,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub related_order_id: Option<String>,
}
