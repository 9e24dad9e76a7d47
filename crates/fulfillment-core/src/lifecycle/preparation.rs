//! Stock handler transitions: preparation and hand-off to a deliverer.

use super::{actor, LifecycleError, OrderLifecycle, TransitionOutcome};
use crate::state::Transition;
use fulfillment_storage::StorageBatch;
use fulfillment_types::{
	truncate_id, AuditAction, NotificationKind, NotificationRequest, Principal, Role,
};
use tracing::instrument;

impl OrderLifecycle {
	/// Starts preparing a confirmed order; the caller becomes its stock handler.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn start_preparing(
		&self,
		order_id: &str,
		principal: &Principal,
	) -> Result<TransitionOutcome, LifecycleError> {
		Self::authorize(principal, Transition::StartPreparing)?;
		let (_order_guard, mut order) = self.lock_order(order_id).await?;
		Self::ensure_allowed(&order, Transition::StartPreparing)?;

		let now = self.clock.now();
		order.status = Transition::StartPreparing.target();
		order.prepared_at.get_or_insert(now);
		order.stock_handler_id = Some(principal.user_id.clone());
		order.updated_at = now;

		let mut batch = StorageBatch::new();
		self.orders.stage(&mut batch, &order)?;
		self.audit
			.record(
				&mut batch,
				&order.id,
				AuditAction::Preparing,
				actor(principal),
				"Preparation started",
				now,
			)
			.await?;
		self.commit(batch).await?;

		tracing::info!(
			order_id = %truncate_id(&order.id),
			status = %order.status,
			"Order preparation started"
		);
		Ok(TransitionOutcome::new(order, Transition::StartPreparing))
	}

	/// Marks an order in preparation as ready for delivery.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn mark_ready(
		&self,
		order_id: &str,
		principal: &Principal,
	) -> Result<TransitionOutcome, LifecycleError> {
		Self::authorize(principal, Transition::MarkReady)?;
		let (_order_guard, mut order) = self.lock_order(order_id).await?;
		Self::ensure_allowed(&order, Transition::MarkReady)?;

		let now = self.clock.now();
		order.status = Transition::MarkReady.target();
		order.ready_at.get_or_insert(now);
		order
			.stock_handler_id
			.get_or_insert_with(|| principal.user_id.clone());
		order.updated_at = now;

		let mut batch = StorageBatch::new();
		self.orders.stage(&mut batch, &order)?;
		self.audit
			.record(
				&mut batch,
				&order.id,
				AuditAction::Ready,
				actor(principal),
				"Order ready for delivery",
				now,
			)
			.await?;
		self.commit(batch).await?;

		tracing::info!(
			order_id = %truncate_id(&order.id),
			status = %order.status,
			"Order ready"
		);
		Ok(TransitionOutcome::new(order, Transition::MarkReady))
	}

	/// Hands an order to a deliverer, who is notified.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), deliverer_id = %truncate_id(deliverer_id)))]
	pub async fn assign_deliverer(
		&self,
		order_id: &str,
		principal: &Principal,
		deliverer_id: &str,
	) -> Result<TransitionOutcome, LifecycleError> {
		Self::authorize(principal, Transition::AssignDeliverer)?;
		let (_order_guard, mut order) = self.lock_order(order_id).await?;
		Self::ensure_allowed(&order, Transition::AssignDeliverer)?;

		let deliverer = self
			.users
			.get_user(deliverer_id)
			.await?
			.ok_or_else(|| LifecycleError::NotFound(format!("Deliverer {}", deliverer_id)))?;
		if deliverer.role != Role::Deliverer {
			return Err(LifecycleError::Validation(format!(
				"user {} is not a deliverer",
				deliverer.username
			)));
		}
		if !deliverer.is_active_account {
			return Err(LifecycleError::Validation(format!(
				"deliverer {} is inactive",
				deliverer.username
			)));
		}

		let now = self.clock.now();
		let deliverer_name = deliverer.display_name();
		order.status = Transition::AssignDeliverer.target();
		order.deliverer_id = Some(deliverer.id.clone());
		order.deliverer_name = Some(deliverer_name.clone());
		order
			.stock_handler_id
			.get_or_insert_with(|| principal.user_id.clone());
		order.updated_at = now;

		let mut batch = StorageBatch::new();
		self.orders.stage(&mut batch, &order)?;
		self.audit
			.record(
				&mut batch,
				&order.id,
				AuditAction::Assigned,
				actor(principal),
				format!("Assigned to deliverer {}", deliverer_name),
				now,
			)
			.await?;
		self.commit(batch).await?;

		let notification = NotificationRequest {
			recipient_user_id: deliverer.id.clone(),
			kind: NotificationKind::OrderAssigned,
			title: "New delivery".into(),
			message: format!(
				"Order {} for {} is assigned to you: {} item(s), total {}",
				order.order_number,
				order.customer_name,
				order.items.len(),
				order.total_amount
			),
			related_order_id: Some(order.id.clone()),
		};

		tracing::info!(
			order_id = %truncate_id(&order.id),
			status = %order.status,
			deliverer = %deliverer_name,
			"Deliverer assigned"
		);
		Ok(TransitionOutcome::new(order, Transition::AssignDeliverer).notify(vec![notification]))
	}
}
