//! Deliverer transitions on their own assigned orders.

use super::{
	actor, ensure_owner, product_ids, validate_reason, LifecycleError, OrderLifecycle,
	TransitionOutcome,
};
use crate::state::Transition;
use fulfillment_storage::StorageBatch;
use fulfillment_types::{
	truncate_id, AuditAction, NotificationKind, NotificationRequest, Principal,
};
use tracing::instrument;

impl OrderLifecycle {
	/// Completes a delivery and notifies the seller.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn mark_delivered(
		&self,
		order_id: &str,
		principal: &Principal,
	) -> Result<TransitionOutcome, LifecycleError> {
		Self::authorize(principal, Transition::MarkDelivered)?;
		let (_order_guard, mut order) = self.lock_order(order_id).await?;
		ensure_owner(order.deliverer_id.as_deref(), principal)?;
		Self::ensure_allowed(&order, Transition::MarkDelivered)?;

		let now = self.clock.now();
		order.status = Transition::MarkDelivered.target();
		order.delivered_at.get_or_insert(now);
		order.updated_at = now;

		let mut batch = StorageBatch::new();
		self.orders.stage(&mut batch, &order)?;
		self.audit
			.record(
				&mut batch,
				&order.id,
				AuditAction::Delivered,
				actor(principal),
				format!("Delivered to {}", order.customer_name),
				now,
			)
			.await?;
		self.commit(batch).await?;

		let notification = NotificationRequest {
			recipient_user_id: order.seller_id.clone(),
			kind: NotificationKind::OrderDelivered,
			title: "Order delivered".into(),
			message: format!(
				"Order {} was delivered to {}",
				order.order_number, order.customer_name
			),
			related_order_id: Some(order.id.clone()),
		};

		tracing::info!(
			order_id = %truncate_id(&order.id),
			status = %order.status,
			"Order delivered"
		);
		Ok(TransitionOutcome::new(order, Transition::MarkDelivered).notify(vec![notification]))
	}

	/// Aborts a delivery, cancels the order and restores its stock.
	///
	/// The seller and the order's stock handler are notified.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn cancel_delivery(
		&self,
		order_id: &str,
		principal: &Principal,
		reason: &str,
	) -> Result<TransitionOutcome, LifecycleError> {
		Self::authorize(principal, Transition::CancelDelivery)?;
		let (_order_guard, mut order) = self.lock_order(order_id).await?;
		ensure_owner(order.deliverer_id.as_deref(), principal)?;
		Self::ensure_allowed(&order, Transition::CancelDelivery)?;
		let reason = validate_reason(reason)?;

		let product_ids = product_ids(order.items.iter().map(|item| item.product_id.as_str()));
		let _products_guard = self.lock_products(&product_ids).await;
		let mut ledger = self.load_ledger(&product_ids).await?;
		Self::release_items(&mut ledger, &order)?;

		let now = self.clock.now();
		order.status = Transition::CancelDelivery.target();
		order.cancelled_at = Some(now);
		order.cancellation_reason = Some(reason.clone());
		order.cancelled_by = Some(principal.user_id.clone());
		order.updated_at = now;

		let mut batch = StorageBatch::new();
		ledger.stage(&mut batch)?;
		self.orders.stage(&mut batch, &order)?;
		self.audit
			.record(
				&mut batch,
				&order.id,
				AuditAction::DeliveryCancelled,
				actor(principal),
				format!("Delivery cancelled: {}", reason),
				now,
			)
			.await?;
		self.commit(batch).await?;

		let mut recipients = vec![order.seller_id.clone()];
		if let Some(handler) = &order.stock_handler_id {
			if !recipients.contains(handler) {
				recipients.push(handler.clone());
			}
		}
		let notifications = recipients
			.into_iter()
			.map(|recipient_user_id| NotificationRequest {
				recipient_user_id,
				kind: NotificationKind::OrderCancelled,
				title: "Delivery cancelled".into(),
				message: format!(
					"Delivery of order {} was cancelled: {}",
					order.order_number, reason
				),
				related_order_id: Some(order.id.clone()),
			})
			.collect();

		tracing::info!(
			order_id = %truncate_id(&order.id),
			status = %order.status,
			"Delivery cancelled"
		);
		Ok(TransitionOutcome::new(order, Transition::CancelDelivery).notify(notifications))
	}
}
