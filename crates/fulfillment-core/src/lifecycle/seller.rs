//! Seller transitions: create, and modify or cancel while the window is open.

use super::{
	actor, build_items, ensure_owner, product_ids, validate_customer_name, validate_items,
	validate_reason, LifecycleError, OrderLifecycle, TransitionOutcome,
};
use crate::state::Transition;
use fulfillment_storage::StorageBatch;
use fulfillment_types::{
	index, truncate_id, AuditAction, CreateOrder, ModifyOrder, Order, OrderStatus, Principal,
	StorageKey,
};
use tracing::instrument;
use uuid::Uuid;

impl OrderLifecycle {
	/// Creates a pending order and reserves its stock.
	#[instrument(skip_all, fields(seller_id = %truncate_id(&principal.user_id)))]
	pub async fn create(
		&self,
		principal: &Principal,
		request: CreateOrder,
	) -> Result<TransitionOutcome, LifecycleError> {
		Self::authorize(principal, Transition::Create)?;
		let customer_name = validate_customer_name(&request.customer_name)?;
		validate_items(&request.items)?;

		let product_ids = product_ids(request.items.iter().map(|item| item.product_id.as_str()));
		let _products_guard = self.lock_products(&product_ids).await;
		let mut ledger = self.load_ledger(&product_ids).await?;
		let items = build_items(&ledger, &request.items)?;
		ledger.reserve_all(
			request
				.items
				.iter()
				.map(|item| (item.product_id.as_str(), item.quantity)),
		)?;

		let seller_name = self
			.users
			.get_user(&principal.user_id)
			.await?
			.map(|user| user.display_name())
			.unwrap_or_else(|| principal.user_id.clone());

		let _index_guard = self
			.locks
			.lock(&StorageKey::Indexes.key(index::ORDERS))
			.await;
		let now = self.clock.now();
		let order_number = self
			.numbers
			.generate(&self.orders, now)
			.await?
			.ok_or_else(|| LifecycleError::Conflict("no free order number".into()))?;

		let mut order = Order {
			id: Uuid::new_v4().to_string(),
			order_number,
			seller_id: principal.user_id.clone(),
			seller_name,
			customer_name,
			status: OrderStatus::Pending,
			items: Vec::new(),
			total_amount: Default::default(),
			is_paid: false,
			created_at: now,
			updated_at: now,
			confirmed_at: None,
			prepared_at: None,
			ready_at: None,
			delivered_at: None,
			cancelled_at: None,
			stock_handler_id: None,
			deliverer_id: None,
			deliverer_name: None,
			cancellation_reason: None,
			cancelled_by: None,
		};
		order.replace_items(items)?;

		let mut batch = StorageBatch::new();
		self.orders.stage_new(&mut batch, &order).await?;
		ledger.stage(&mut batch)?;
		self.audit
			.record(
				&mut batch,
				&order.id,
				AuditAction::Created,
				actor(principal),
				format!(
					"Order {} created for {}: {} item(s), total {}",
					order.order_number,
					order.customer_name,
					order.items.len(),
					order.total_amount
				),
				now,
			)
			.await?;
		self.commit(batch).await?;

		tracing::info!(
			order_id = %truncate_id(&order.id),
			order_number = %order.order_number,
			total = %order.total_amount,
			"Order created"
		);
		Ok(TransitionOutcome::new(order, Transition::Create))
	}

	/// Changes the customer name and/or replaces the items of a pending order.
	///
	/// A replacement item set releases the old reservations and reserves the
	/// new ones as one unit; on failure the order keeps its old items.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn modify(
		&self,
		order_id: &str,
		principal: &Principal,
		request: ModifyOrder,
	) -> Result<TransitionOutcome, LifecycleError> {
		Self::authorize(principal, Transition::Modify)?;
		let (_order_guard, mut order) = self.lock_order(order_id).await?;
		ensure_owner(Some(order.seller_id.as_str()), principal)?;
		Self::ensure_allowed(&order, Transition::Modify)?;
		let now = self.clock.now();
		if !self.window.can_modify(&order, now) {
			return Err(LifecycleError::WindowExpired);
		}

		if request.customer_name.is_none() && request.items.is_none() {
			return Err(LifecycleError::Validation("nothing to modify".into()));
		}
		let customer_name = request
			.customer_name
			.as_deref()
			.map(validate_customer_name)
			.transpose()?;
		if let Some(items) = &request.items {
			validate_items(items)?;
		}

		let mut batch = StorageBatch::new();
		let mut changes = Vec::new();
		let mut _products_guard = None;

		if let Some(requests) = request.items {
			let product_ids = product_ids(
				order
					.items
					.iter()
					.map(|item| item.product_id.as_str())
					.chain(requests.iter().map(|item| item.product_id.as_str())),
			);
			_products_guard = Some(self.lock_products(&product_ids).await);
			let mut ledger = self.load_ledger(&product_ids).await?;
			let items = build_items(&ledger, &requests)?;

			Self::release_items(&mut ledger, &order)?;
			ledger.reserve_all(
				requests
					.iter()
					.map(|item| (item.product_id.as_str(), item.quantity)),
			)?;
			ledger.stage(&mut batch)?;

			let previous_total = order.total_amount;
			order.replace_items(items)?;
			changes.push(format!(
				"items replaced, total {} -> {}",
				previous_total, order.total_amount
			));
		}

		if let Some(name) = customer_name {
			if name != order.customer_name {
				changes.push(format!("customer {} -> {}", order.customer_name, name));
				order.customer_name = name;
			}
		}

		order.updated_at = now;
		self.orders.stage(&mut batch, &order)?;
		let description = if changes.is_empty() {
			"Order modified".to_string()
		} else {
			format!("Order modified: {}", changes.join("; "))
		};
		self.audit
			.record(
				&mut batch,
				&order.id,
				AuditAction::Modified,
				actor(principal),
				description,
				now,
			)
			.await?;
		self.commit(batch).await?;

		tracing::info!(
			order_id = %truncate_id(&order.id),
			total = %order.total_amount,
			"Order modified"
		);
		Ok(TransitionOutcome::new(order, Transition::Modify))
	}

	/// Cancels a pending order and restores its stock.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn cancel(
		&self,
		order_id: &str,
		principal: &Principal,
		reason: &str,
	) -> Result<TransitionOutcome, LifecycleError> {
		Self::authorize(principal, Transition::Cancel)?;
		let (_order_guard, mut order) = self.lock_order(order_id).await?;
		ensure_owner(Some(order.seller_id.as_str()), principal)?;
		Self::ensure_allowed(&order, Transition::Cancel)?;
		let now = self.clock.now();
		if !self.window.can_cancel(&order, now) {
			return Err(LifecycleError::WindowExpired);
		}
		let reason = validate_reason(reason)?;

		let product_ids = product_ids(order.items.iter().map(|item| item.product_id.as_str()));
		let _products_guard = self.lock_products(&product_ids).await;
		let mut ledger = self.load_ledger(&product_ids).await?;
		Self::release_items(&mut ledger, &order)?;

		order.status = Transition::Cancel.target();
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
				AuditAction::Cancelled,
				actor(principal),
				format!("Order cancelled by seller: {}", reason),
				now,
			)
			.await?;
		self.commit(batch).await?;

		tracing::info!(
			order_id = %truncate_id(&order.id),
			status = %order.status,
			"Order cancelled"
		);
		Ok(TransitionOutcome::new(order, Transition::Cancel))
	}
}
