//! Automatic confirmation once the window has elapsed.

use super::{LifecycleError, OrderLifecycle, TransitionOutcome};
use crate::audit::AuditActor;
use crate::state::Transition;
use fulfillment_storage::StorageBatch;
use fulfillment_types::{
	truncate_id, AuditAction, NotificationKind, NotificationRequest, Role, SYSTEM_ROLE,
};
use tracing::instrument;

impl OrderLifecycle {
	/// Confirms a pending order whose window has elapsed.
	///
	/// Returns `None` when there is nothing to do: the order is no longer
	/// pending or its window is still open. Every active stock handler is
	/// notified of a confirmation.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn auto_confirm(
		&self,
		order_id: &str,
	) -> Result<Option<TransitionOutcome>, LifecycleError> {
		let (_order_guard, mut order) = self.lock_order(order_id).await?;
		let now = self.clock.now();
		if !self.window.should_confirm(&order, now) {
			tracing::debug!(status = %order.status, "Nothing to confirm");
			return Ok(None);
		}

		order.status = Transition::AutoConfirm.target();
		order.confirmed_at = Some(now);
		order.updated_at = now;

		let mut batch = StorageBatch::new();
		self.orders.stage(&mut batch, &order)?;
		self.audit
			.record(
				&mut batch,
				&order.id,
				AuditAction::Confirmed,
				AuditActor {
					user_id: None,
					role: SYSTEM_ROLE,
				},
				format!(
					"Order confirmed automatically after the {}s confirmation window",
					self.window.seconds()
				),
				now,
			)
			.await?;
		let stock_handlers = self.users.list_active(Role::StockHandler).await?;
		self.commit(batch).await?;

		let notifications = stock_handlers
			.iter()
			.map(|handler| NotificationRequest {
				recipient_user_id: handler.id.clone(),
				kind: NotificationKind::OrderConfirmed,
				title: "New order to prepare".into(),
				message: format!(
					"Order {} for {} is confirmed: {} item(s), total {}",
					order.order_number,
					order.customer_name,
					order.items.len(),
					order.total_amount
				),
				related_order_id: Some(order.id.clone()),
			})
			.collect::<Vec<_>>();

		tracing::info!(
			order_id = %truncate_id(&order.id),
			status = %order.status,
			notified = notifications.len(),
			"Order confirmed"
		);
		Ok(Some(
			TransitionOutcome::new(order, Transition::AutoConfirm).notify(notifications),
		))
	}
}
