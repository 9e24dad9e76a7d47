//! Confirmation sweeper for pending orders.
//!
//! Promotes pending orders whose window has elapsed, either for a single
//! order when someone looks at it or for every pending order on the engine's
//! sweep interval. The promotion itself re-checks the order inside its lock,
//! so concurrent sweeps and a racing cancel resolve to exactly one winner.

use crate::engine::publisher::TransitionPublisher;
use crate::lifecycle::{LifecycleError, OrderLifecycle};
use crate::state::OrderStore;
use fulfillment_types::{truncate_id, FulfillmentEvent, Order, OrderStatus, SweepEvent};
use std::sync::Arc;

/// Result of one pass over the pending orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
	/// Pending orders looked at.
	pub examined: usize,
	/// Orders confirmed by this pass.
	pub confirmed: usize,
}

/// Evaluates pending orders against the confirmation window.
pub struct ConfirmationSweeper {
	lifecycle: Arc<OrderLifecycle>,
	orders: OrderStore,
	publisher: TransitionPublisher,
}

impl ConfirmationSweeper {
	pub fn new(
		lifecycle: Arc<OrderLifecycle>,
		orders: OrderStore,
		publisher: TransitionPublisher,
	) -> Self {
		Self {
			lifecycle,
			orders,
			publisher,
		}
	}

	/// Confirms one order if its window has elapsed.
	///
	/// Returns the confirmed order, or `None` when nothing changed.
	pub async fn sweep_order(&self, order_id: &str) -> Result<Option<Order>, LifecycleError> {
		match self.lifecycle.auto_confirm(order_id).await? {
			Some(outcome) => Ok(Some(self.publisher.publish(outcome))),
			None => Ok(None),
		}
	}

	/// Confirms every pending order whose window has elapsed.
	///
	/// A failure on one order is logged and does not stop the pass.
	pub async fn sweep_pending(&self) -> Result<SweepSummary, LifecycleError> {
		let now = self.lifecycle.now();
		let window = self.lifecycle.window();
		let pending: Vec<Order> = self
			.orders
			.list()
			.await?
			.into_iter()
			.filter(|order| order.status == OrderStatus::Pending)
			.collect();

		let mut summary = SweepSummary {
			examined: pending.len(),
			confirmed: 0,
		};
		for order in pending.iter().filter(|o| window.should_confirm(o, now)) {
			match self.sweep_order(&order.id).await {
				Ok(Some(_)) => summary.confirmed += 1,
				Ok(None) => {},
				Err(e) => {
					tracing::warn!(
						order_id = %truncate_id(&order.id),
						error = %e,
						"Failed to confirm order"
					);
				},
			}
		}

		if summary.confirmed > 0 {
			tracing::info!(
				examined = summary.examined,
				confirmed = summary.confirmed,
				"Sweep confirmed orders"
			);
		} else {
			tracing::debug!(examined = summary.examined, "Sweep found nothing to confirm");
		}
		self.publisher
			.event_bus()
			.publish(FulfillmentEvent::Sweep(SweepEvent::Completed {
				examined: summary.examined,
				confirmed: summary.confirmed,
			}))
			.ok();
		Ok(summary)
	}
}
