//! Post-commit effects of a transition.

use super::event_bus::EventBus;
use crate::lifecycle::TransitionOutcome;
use fulfillment_notify::NotificationService;
use fulfillment_types::{FulfillmentEvent, Order, OrderEvent};
use std::sync::Arc;

/// Publishes committed transitions and hands their notifications off.
///
/// Must be called after the transition released its locks.
#[derive(Clone)]
pub struct TransitionPublisher {
	event_bus: EventBus,
	notifications: Arc<NotificationService>,
}

impl TransitionPublisher {
	pub fn new(event_bus: EventBus, notifications: Arc<NotificationService>) -> Self {
		Self {
			event_bus,
			notifications,
		}
	}

	/// Returns the committed order.
	pub fn publish(&self, outcome: TransitionOutcome) -> Order {
		let TransitionOutcome {
			order,
			transition,
			notifications,
		} = outcome;

		self.event_bus
			.publish(FulfillmentEvent::Order(OrderEvent::Transitioned {
				order_id: order.id.clone(),
				order_number: order.order_number.clone(),
				action: transition.action(),
				status: order.status,
			}))
			.ok();

		if !notifications.is_empty() {
			self.notifications.dispatch(notifications);
		}
		order
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}
}
