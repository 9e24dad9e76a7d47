//! The order lifecycle transition table.
//!
//! Orders move: Pending -> Confirmed -> Preparing -> Ready -> InDelivery ->
//! Delivered. Pending orders may be cancelled by their seller and orders in
//! delivery by their deliverer. Delivered and Cancelled are terminal.

use fulfillment_types::{AuditAction, Capability, OrderStatus};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Every event that changes an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
	Create,
	Modify,
	Cancel,
	AutoConfirm,
	StartPreparing,
	MarkReady,
	AssignDeliverer,
	MarkDelivered,
	CancelDelivery,
}

const ALL_STATUSES: [OrderStatus; 7] = [
	OrderStatus::Pending,
	OrderStatus::Confirmed,
	OrderStatus::Preparing,
	OrderStatus::Ready,
	OrderStatus::InDelivery,
	OrderStatus::Delivered,
	OrderStatus::Cancelled,
];

// Static transition table - each status maps to the transitions it accepts
static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<Transition>>> = Lazy::new(|| {
	use Transition::*;

	let mut m = HashMap::new();
	m.insert(
		OrderStatus::Pending,
		HashSet::from([Modify, Cancel, AutoConfirm]),
	);
	m.insert(
		OrderStatus::Confirmed,
		HashSet::from([StartPreparing, AssignDeliverer]),
	);
	m.insert(
		OrderStatus::Preparing,
		HashSet::from([MarkReady, AssignDeliverer]),
	);
	m.insert(OrderStatus::Ready, HashSet::from([AssignDeliverer]));
	m.insert(
		OrderStatus::InDelivery,
		HashSet::from([MarkDelivered, CancelDelivery]),
	);
	m.insert(OrderStatus::Delivered, HashSet::new()); // terminal
	m.insert(OrderStatus::Cancelled, HashSet::new()); // terminal
	m
});

impl Transition {
	pub fn as_str(&self) -> &'static str {
		match self {
			Transition::Create => "create",
			Transition::Modify => "modify",
			Transition::Cancel => "cancel",
			Transition::AutoConfirm => "auto_confirm",
			Transition::StartPreparing => "start_preparing",
			Transition::MarkReady => "mark_ready",
			Transition::AssignDeliverer => "assign_deliverer",
			Transition::MarkDelivered => "mark_delivered",
			Transition::CancelDelivery => "cancel_delivery",
		}
	}

	/// Whether the transition may start from `status`.
	pub fn allows(&self, status: OrderStatus) -> bool {
		TRANSITIONS
			.get(&status)
			.is_some_and(|set| set.contains(self))
	}

	/// Statuses the transition may start from. Empty for `Create`.
	pub fn from_states(&self) -> Vec<OrderStatus> {
		ALL_STATUSES
			.into_iter()
			.filter(|status| self.allows(*status))
			.collect()
	}

	/// Status an order has after the transition.
	pub fn target(&self) -> OrderStatus {
		match self {
			Transition::Create | Transition::Modify => OrderStatus::Pending,
			Transition::AutoConfirm => OrderStatus::Confirmed,
			Transition::StartPreparing => OrderStatus::Preparing,
			Transition::MarkReady => OrderStatus::Ready,
			Transition::AssignDeliverer => OrderStatus::InDelivery,
			Transition::MarkDelivered => OrderStatus::Delivered,
			Transition::Cancel | Transition::CancelDelivery => OrderStatus::Cancelled,
		}
	}

	/// Capability the acting principal needs; `None` for engine-driven
	/// transitions.
	pub fn capability(&self) -> Option<Capability> {
		match self {
			Transition::Create => Some(Capability::CreateOrder),
			Transition::Modify | Transition::Cancel => Some(Capability::ManagePendingOrder),
			Transition::AutoConfirm => None,
			Transition::StartPreparing | Transition::MarkReady => Some(Capability::PrepareOrder),
			Transition::AssignDeliverer => Some(Capability::AssignDeliverer),
			Transition::MarkDelivered | Transition::CancelDelivery => {
				Some(Capability::CompleteDelivery)
			},
		}
	}

	/// Audit action recorded when the transition commits.
	pub fn action(&self) -> AuditAction {
		match self {
			Transition::Create => AuditAction::Created,
			Transition::Modify => AuditAction::Modified,
			Transition::Cancel => AuditAction::Cancelled,
			Transition::AutoConfirm => AuditAction::Confirmed,
			Transition::StartPreparing => AuditAction::Preparing,
			Transition::MarkReady => AuditAction::Ready,
			Transition::AssignDeliverer => AuditAction::Assigned,
			Transition::MarkDelivered => AuditAction::Delivered,
			Transition::CancelDelivery => AuditAction::DeliveryCancelled,
		}
	}
}

impl fmt::Display for Transition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_terminal_statuses_accept_nothing() {
		let all = [
			Transition::Create,
			Transition::Modify,
			Transition::Cancel,
			Transition::AutoConfirm,
			Transition::StartPreparing,
			Transition::MarkReady,
			Transition::AssignDeliverer,
			Transition::MarkDelivered,
			Transition::CancelDelivery,
		];
		for transition in all {
			assert!(!transition.allows(OrderStatus::Delivered));
			assert!(!transition.allows(OrderStatus::Cancelled));
		}
	}

	#[test]
	fn test_assign_from_three_states() {
		assert_eq!(
			Transition::AssignDeliverer.from_states(),
			vec![
				OrderStatus::Confirmed,
				OrderStatus::Preparing,
				OrderStatus::Ready
			]
		);
		assert!(Transition::Create.from_states().is_empty());
	}

	#[test]
	fn test_targets_are_reachable_statuses() {
		assert_eq!(Transition::Cancel.target(), OrderStatus::Cancelled);
		assert_eq!(Transition::CancelDelivery.target(), OrderStatus::Cancelled);
		assert_eq!(Transition::AutoConfirm.capability(), None);
		assert_eq!(
			Transition::MarkReady.capability(),
			Some(Capability::PrepareOrder)
		);
		assert_eq!(
			Transition::CancelDelivery.action(),
			AuditAction::DeliveryCancelled
		);
	}
}
