//! Read models over stored orders.
//!
//! Reads that show a single order run the on-demand sweep first, so a
//! pending order whose window elapsed is reported as confirmed. Listings are
//! newest first.

use super::FulfillmentEngine;
use crate::audit::AuditTrail;
use crate::lifecycle::LifecycleError;
use fulfillment_types::{
	AuditEvent, Capability, DelivererSummary, Order, OrderSnapshot, OrderStatus,
	OrderStatusReport, Principal, Role,
};
use std::cmp::Reverse;

const QUEUE_STATUSES: [OrderStatus; 3] = [
	OrderStatus::Confirmed,
	OrderStatus::Preparing,
	OrderStatus::Ready,
];

fn require_active(principal: &Principal) -> Result<(), LifecycleError> {
	if principal.is_active {
		Ok(())
	} else {
		Err(LifecycleError::Forbidden(format!(
			"account {} is inactive",
			principal.user_id
		)))
	}
}

fn require(principal: &Principal, capability: Capability) -> Result<(), LifecycleError> {
	require_active(principal)?;
	if principal.can(capability) {
		Ok(())
	} else {
		Err(LifecycleError::Forbidden(format!(
			"role {} cannot view these orders",
			principal.role
		)))
	}
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
	orders.sort_by_key(|o| Reverse((o.created_at, o.order_number.clone())));
	orders
}

impl FulfillmentEngine {
	/// Sweeps the order on demand and returns its current state.
	pub(crate) async fn current_order(
		&self,
		order_id: &str,
		principal: &Principal,
	) -> Result<Order, LifecycleError> {
		require_active(principal)?;
		if let Some(order) = self.sweeper.sweep_order(order_id).await? {
			return Ok(order);
		}
		self.orders
			.get(order_id)
			.await?
			.ok_or_else(|| LifecycleError::NotFound(format!("Order {}", order_id)))
	}

	async fn filtered<F>(&self, keep: F) -> Result<Vec<Order>, LifecycleError>
	where
		F: Fn(&Order) -> bool,
	{
		let orders = self.orders.list().await?.into_iter().filter(keep).collect();
		Ok(newest_first(orders))
	}

	/// An order with its derived window fields.
	pub async fn order_detail(
		&self,
		order_id: &str,
		principal: &Principal,
	) -> Result<OrderSnapshot, LifecycleError> {
		let order = self.current_order(order_id, principal).await?;
		Ok(self.window().snapshot(order, self.lifecycle.now()))
	}

	/// Runs the on-demand sweep for an order and reports its window state.
	pub async fn check_order_status(
		&self,
		order_id: &str,
		principal: &Principal,
	) -> Result<OrderStatusReport, LifecycleError> {
		let order = self.current_order(order_id, principal).await?;
		Ok(self.window().report(&order, self.lifecycle.now()))
	}

	/// History of an order, newest first.
	pub async fn get_history(&self, order_id: &str) -> Result<Vec<AuditEvent>, LifecycleError> {
		if self.orders.get(order_id).await?.is_none() {
			return Err(LifecycleError::NotFound(format!("Order {}", order_id)));
		}
		Ok(AuditTrail::new(self.storage.clone()).list(order_id).await?)
	}

	/// Orders created by the seller.
	pub async fn seller_orders(&self, principal: &Principal) -> Result<Vec<Order>, LifecycleError> {
		require(principal, Capability::CreateOrder)?;
		self.filtered(|o| o.seller_id == principal.user_id).await
	}

	/// Orders waiting on stock handlers: confirmed, preparing or ready.
	pub async fn stock_handler_queue(
		&self,
		principal: &Principal,
	) -> Result<Vec<Order>, LifecycleError> {
		require(principal, Capability::PrepareOrder)?;
		self.sweeper.sweep_pending().await?;
		self.filtered(|o| QUEUE_STATUSES.contains(&o.status)).await
	}

	/// Orders the stock handler prepared, plus the current queue.
	pub async fn stock_handler_history(
		&self,
		principal: &Principal,
	) -> Result<Vec<Order>, LifecycleError> {
		require(principal, Capability::PrepareOrder)?;
		self.filtered(|o| {
			o.stock_handler_id.as_deref() == Some(principal.user_id.as_str())
				|| QUEUE_STATUSES.contains(&o.status)
		})
		.await
	}

	/// Orders the deliverer is currently delivering.
	pub async fn deliverer_active(&self, principal: &Principal) -> Result<Vec<Order>, LifecycleError> {
		require(principal, Capability::CompleteDelivery)?;
		self.filtered(|o| {
			o.status == OrderStatus::InDelivery
				&& o.deliverer_id.as_deref() == Some(principal.user_id.as_str())
		})
		.await
	}

	/// Every order ever assigned to the deliverer.
	pub async fn deliverer_history(
		&self,
		principal: &Principal,
	) -> Result<Vec<Order>, LifecycleError> {
		require(principal, Capability::CompleteDelivery)?;
		self.filtered(|o| o.deliverer_id.as_deref() == Some(principal.user_id.as_str()))
			.await
	}

	/// Deliverers a stock handler can assign, with their current load.
	///
	/// Lists every deliverer when none is active.
	pub async fn available_deliverers(
		&self,
		principal: &Principal,
	) -> Result<Vec<DelivererSummary>, LifecycleError> {
		require(principal, Capability::ViewDeliverers)?;
		let mut deliverers = self.users.list_active(Role::Deliverer).await?;
		if deliverers.is_empty() {
			tracing::debug!("No active deliverer, listing all deliverers");
			deliverers = self.users.list_by_role(Role::Deliverer).await?;
		}

		let in_delivery: Vec<Order> = self
			.orders
			.list()
			.await?
			.into_iter()
			.filter(|o| o.status == OrderStatus::InDelivery)
			.collect();

		Ok(deliverers
			.into_iter()
			.map(|user| DelivererSummary {
				active_deliveries: in_delivery
					.iter()
					.filter(|o| o.deliverer_id.as_deref() == Some(user.id.as_str()))
					.count(),
				full_name: user.display_name(),
				id: user.id,
				username: user.username,
				latitude: user.latitude,
				longitude: user.longitude,
			})
			.collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{Duration, Utc};
	use rust_decimal::Decimal;

	fn order(number: &str, minutes_ago: i64) -> Order {
		let now = Utc::now();
		Order {
			id: number.to_lowercase(),
			order_number: number.to_string(),
			seller_id: "s1".into(),
			seller_name: "Sara".into(),
			customer_name: "Client".into(),
			status: OrderStatus::Pending,
			items: Vec::new(),
			total_amount: Decimal::ZERO,
			is_paid: false,
			created_at: now - Duration::minutes(minutes_ago),
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
		}
	}

	#[test]
	fn test_listing_order_is_newest_first() {
		let sorted = newest_first(vec![order("A", 10), order("B", 1), order("C", 5)]);
		let numbers: Vec<_> = sorted.iter().map(|o| o.order_number.as_str()).collect();
		assert_eq!(numbers, vec!["B", "C", "A"]);
	}

	#[test]
	fn test_read_access_is_role_gated() {
		let handler = Principal::new("h1", Role::StockHandler);
		assert!(require(&handler, Capability::PrepareOrder).is_ok());
		assert!(require(&handler, Capability::CreateOrder).is_err());

		let mut seller = Principal::new("s1", Role::Seller);
		seller.is_active = false;
		assert!(matches!(
			require_active(&seller),
			Err(LifecycleError::Forbidden(_))
		));
	}
}
