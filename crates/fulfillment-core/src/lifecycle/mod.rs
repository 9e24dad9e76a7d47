//! The order lifecycle state machine.
//!
//! [`OrderLifecycle`] validates and applies every transition of
//! [`Transition`]. Each transition locks the order (and the product rows it
//! touches), evaluates its guards against freshly read records, stages the
//! order, stock and audit writes into one batch and commits it. Guards are
//! checked in a fixed order: role, existence, ownership, status, window,
//! fields, stock. A rejected transition writes nothing.
//!
//! Notification requests are returned in the [`TransitionOutcome`] and are
//! handed off by the caller once the locks are released.

mod confirmation;
mod delivery;
mod preparation;
mod seller;

use crate::audit::{AuditActor, AuditTrail};
use crate::catalog::{ProductCatalog, UserDirectory};
use crate::clock::TimeSource;
use crate::order_number::OrderNumberGenerator;
use crate::state::{ConfirmationWindow, LockGuard, LockTable, OrderStore, Transition};
use crate::stock::{StockError, StockLedger};
use chrono::{DateTime, Utc};
use fulfillment_storage::{StorageBatch, StorageError, StorageService};
use fulfillment_types::{
	truncate_id, AmountOverflow, AuditAction, ItemRequest, NotificationRequest, Order, OrderItem, OrderStatus,
	Principal, StorageKey,
};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by lifecycle operations.
///
/// All variants but `Storage` are business outcomes the caller can act on.
#[derive(Debug, Error)]
pub enum LifecycleError {
	#[error("{0} not found")]
	NotFound(String),
	#[error("Forbidden: {0}")]
	Forbidden(String),
	#[error("Cannot {transition} an order that is {from}")]
	InvalidTransition {
		from: OrderStatus,
		transition: Transition,
	},
	#[error("The confirmation window of this order has expired")]
	WindowExpired,
	#[error("Validation error: {0}")]
	Validation(String),
	#[error("Insufficient stock for {product}: {available} available, {requested} requested")]
	InsufficientStock {
		product: String,
		available: Decimal,
		requested: Decimal,
	},
	#[error("Conflict: {0}")]
	Conflict(String),
	#[error("Storage error: {0}")]
	Storage(String),
}

impl LifecycleError {
	/// Stable machine-readable name of the error.
	pub fn kind(&self) -> &'static str {
		match self {
			LifecycleError::NotFound(_) => "not_found",
			LifecycleError::Forbidden(_) => "forbidden",
			LifecycleError::InvalidTransition { .. } => "invalid_transition",
			LifecycleError::WindowExpired => "window_expired",
			LifecycleError::Validation(_) => "validation_error",
			LifecycleError::InsufficientStock { .. } => "insufficient_stock",
			LifecycleError::Conflict(_) => "conflict",
			LifecycleError::Storage(_) => "storage_error",
		}
	}

	/// Whether the error is a business outcome rather than a system failure.
	pub fn is_business(&self) -> bool {
		!matches!(self, LifecycleError::Storage(_))
	}
}

impl From<StorageError> for LifecycleError {
	fn from(err: StorageError) -> Self {
		LifecycleError::Storage(err.to_string())
	}
}

impl From<StockError> for LifecycleError {
	fn from(err: StockError) -> Self {
		match err {
			StockError::UnknownProduct(id) => LifecycleError::NotFound(format!("Product {}", id)),
			StockError::Insufficient {
				product,
				available,
				requested,
			} => LifecycleError::InsufficientStock {
				product,
				available,
				requested,
			},
			StockError::Overflow(product, quantity) => LifecycleError::Validation(format!(
				"stock of {} cannot take {} back",
				product, quantity
			)),
		}
	}
}

impl From<AmountOverflow> for LifecycleError {
	fn from(err: AmountOverflow) -> Self {
		LifecycleError::Validation(err.to_string().to_lowercase())
	}
}

/// A committed transition.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
	/// The order as committed.
	pub order: Order,
	pub transition: Transition,
	/// Requests to hand to the notification sink.
	pub notifications: Vec<NotificationRequest>,
}

impl TransitionOutcome {
	fn new(order: Order, transition: Transition) -> Self {
		Self {
			order,
			transition,
			notifications: Vec::new(),
		}
	}

	fn notify(mut self, notifications: Vec<NotificationRequest>) -> Self {
		self.notifications = notifications;
		self
	}

	pub fn action(&self) -> AuditAction {
		self.transition.action()
	}
}

/// Validates and applies order transitions.
pub struct OrderLifecycle {
	storage: Arc<StorageService>,
	orders: OrderStore,
	products: ProductCatalog,
	users: UserDirectory,
	audit: AuditTrail,
	locks: LockTable,
	numbers: OrderNumberGenerator,
	window: ConfirmationWindow,
	clock: Arc<dyn TimeSource>,
}

impl OrderLifecycle {
	pub fn new(
		storage: Arc<StorageService>,
		clock: Arc<dyn TimeSource>,
		window: ConfirmationWindow,
		order_number_prefix: &str,
	) -> Self {
		Self {
			orders: OrderStore::new(storage.clone()),
			products: ProductCatalog::new(storage.clone()),
			users: UserDirectory::new(storage.clone()),
			audit: AuditTrail::new(storage.clone()),
			storage,
			locks: LockTable::new(),
			numbers: OrderNumberGenerator::new(order_number_prefix),
			window,
			clock,
		}
	}

	pub fn window(&self) -> ConfirmationWindow {
		self.window
	}

	pub fn now(&self) -> DateTime<Utc> {
		self.clock.now()
	}

	/// Checks the principal is active and holds the transition's capability.
	fn authorize(principal: &Principal, transition: Transition) -> Result<(), LifecycleError> {
		if !principal.is_active {
			return Err(LifecycleError::Forbidden(format!(
				"account {} is inactive",
				principal.user_id
			)));
		}
		match transition.capability() {
			Some(capability) if !principal.role.grants(capability) => {
				Err(LifecycleError::Forbidden(format!(
					"role {} cannot {}",
					principal.role, transition
				)))
			},
			_ => Ok(()),
		}
	}

	fn ensure_allowed(order: &Order, transition: Transition) -> Result<(), LifecycleError> {
		if transition.allows(order.status) {
			Ok(())
		} else {
			Err(LifecycleError::InvalidTransition {
				from: order.status,
				transition,
			})
		}
	}

	/// Locks an order and reads it.
	async fn lock_order(&self, order_id: &str) -> Result<(LockGuard, Order), LifecycleError> {
		let guard = self.locks.lock(&StorageKey::Orders.key(order_id)).await;
		let order = self
			.orders
			.get(order_id)
			.await?
			.ok_or_else(|| LifecycleError::NotFound(format!("Order {}", order_id)))?;
		Ok((guard, order))
	}

	/// Locks product rows in key order.
	async fn lock_products(&self, product_ids: &BTreeSet<String>) -> LockGuard {
		self.locks
			.lock_all(product_ids.iter().map(|id| StorageKey::Products.key(id)))
			.await
	}

	/// Reads the products into a ledger. Missing products are left out.
	async fn load_ledger(&self, product_ids: &BTreeSet<String>) -> Result<StockLedger, LifecycleError> {
		let mut products = Vec::with_capacity(product_ids.len());
		for id in product_ids {
			if let Some(product) = self.products.get_product(id).await? {
				products.push(product);
			}
		}
		Ok(StockLedger::new(products))
	}

	/// Puts the stock of every item of the order back.
	///
	/// Products removed since the order was placed are skipped.
	fn release_items(ledger: &mut StockLedger, order: &Order) -> Result<(), LifecycleError> {
		for item in &order.items {
			match ledger.release(&item.product_id, item.quantity) {
				Ok(()) => {},
				Err(StockError::UnknownProduct(_)) => tracing::warn!(
					order_id = %truncate_id(&order.id),
					product_id = %item.product_id,
					"Stock not restored for removed product"
				),
				Err(e) => return Err(e.into()),
			}
		}
		Ok(())
	}

	async fn commit(&self, batch: StorageBatch) -> Result<(), LifecycleError> {
		self.storage.commit(batch).await.map_err(|e| {
			tracing::error!(error = %e, "Failed to commit transition");
			LifecycleError::from(e)
		})
	}
}

fn actor(principal: &Principal) -> AuditActor<'_> {
	AuditActor {
		user_id: Some(&principal.user_id),
		role: principal.role.as_str(),
	}
}

fn ensure_owner(owner_id: Option<&str>, principal: &Principal) -> Result<(), LifecycleError> {
	if owner_id == Some(principal.user_id.as_str()) {
		Ok(())
	} else {
		Err(LifecycleError::Forbidden(format!(
			"order does not belong to {}",
			principal.user_id
		)))
	}
}

fn validate_customer_name(name: &str) -> Result<String, LifecycleError> {
	let name = name.trim();
	if name.is_empty() {
		return Err(LifecycleError::Validation(
			"customer name cannot be empty".into(),
		));
	}
	Ok(name.to_string())
}

fn validate_reason(reason: &str) -> Result<String, LifecycleError> {
	let reason = reason.trim();
	if reason.is_empty() {
		return Err(LifecycleError::Validation(
			"a cancellation reason is required".into(),
		));
	}
	Ok(reason.to_string())
}

fn validate_items(items: &[ItemRequest]) -> Result<(), LifecycleError> {
	if items.is_empty() {
		return Err(LifecycleError::Validation(
			"an order needs at least one item".into(),
		));
	}
	for item in items {
		if item.product_id.trim().is_empty() {
			return Err(LifecycleError::Validation(
				"item without a product".into(),
			));
		}
		if item.quantity <= Decimal::ZERO {
			return Err(LifecycleError::Validation(format!(
				"quantity of product {} must be positive",
				item.product_id
			)));
		}
	}
	Ok(())
}

/// Distinct product ids, owned so no borrow of the lines outlives the call.
fn product_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
	ids.into_iter().map(str::to_string).collect()
}

/// Builds order lines from the ledger's product snapshots.
fn build_items(ledger: &StockLedger, requests: &[ItemRequest]) -> Result<Vec<OrderItem>, LifecycleError> {
	requests
		.iter()
		.map(|request| {
			let product = ledger.product(&request.product_id).ok_or_else(|| {
				LifecycleError::NotFound(format!("Product {}", request.product_id))
			})?;
			if !product.is_orderable() {
				return Err(LifecycleError::Validation(format!(
					"product {} is not available for ordering",
					product.name
				)));
			}
			OrderItem::from_product(product, request.quantity).map_err(LifecycleError::from)
		})
		.collect()
}
