//! Order types for the fulfillment system.
//!
//! An order is the root entity of the lifecycle. It owns its items and keeps
//! a snapshot of every name and price it was built from, so later edits to
//! sellers, deliverers or products never rewrite an existing order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::ProductRecord;

/// A line total or order total does not fit in a [`Decimal`].
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("Order amount is too large")]
pub struct AmountOverflow;

/// A customer order moving through the fulfillment lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
	/// Unique identifier for this order.
	pub id: String,
	/// Human-facing order number, immutable once assigned.
	pub order_number: String,
	/// User who created the order.
	pub seller_id: String,
	/// Seller display name at creation time.
	pub seller_name: String,
	/// Name of the customer the order is for.
	pub customer_name: String,
	/// Current lifecycle status.
	pub status: OrderStatus,
	/// Line items owned by this order.
	pub items: Vec<OrderItem>,
	/// Sum of all item line totals.
	pub total_amount: Decimal,
	/// Whether the customer has paid.
	#[serde(default)]
	pub is_paid: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub confirmed_at: Option<DateTime<Utc>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub prepared_at: Option<DateTime<Utc>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ready_at: Option<DateTime<Utc>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub delivered_at: Option<DateTime<Utc>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cancelled_at: Option<DateTime<Utc>>,
	/// Stock handler who started preparing the order.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stock_handler_id: Option<String>,
	/// Deliverer assigned to the order.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub deliverer_id: Option<String>,
	/// Deliverer display name at assignment time.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub deliverer_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cancellation_reason: Option<String>,
	/// User who cancelled the order.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cancelled_by: Option<String>,
}

impl Order {
	/// Replaces the item set and recomputes the total in one step.
	///
	/// On overflow the order keeps its previous items and total.
	pub fn replace_items(&mut self, items: Vec<OrderItem>) -> Result<(), AmountOverflow> {
		let total = items.iter().try_fold(Decimal::ZERO, |total, item| {
			total.checked_add(item.line_total).ok_or(AmountOverflow)
		})?;
		self.items = items;
		self.total_amount = total;
		Ok(())
	}
}

/// A single product line of an order.
///
/// Product name, unit and unit price are copied from the product when the
/// line is built and never follow later product edits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
	pub product_id: String,
	pub product_name: String,
	/// Ordered quantity; fractional for weighed goods.
	pub quantity: Decimal,
	pub unit: String,
	pub unit_price: Decimal,
	/// Always `unit_price * quantity`.
	pub line_total: Decimal,
}

impl OrderItem {
	/// Builds a line from the current state of a product.
	pub fn from_product(product: &ProductRecord, quantity: Decimal) -> Result<Self, AmountOverflow> {
		let line_total = product.price.checked_mul(quantity).ok_or(AmountOverflow)?;
		Ok(Self {
			product_id: product.id.clone(),
			product_name: product.name.clone(),
			quantity,
			unit: product.unit.clone(),
			unit_price: product.price,
			line_total,
		})
	}
}

/// Status of an order in the fulfillment lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
	/// Inside the confirmation window; the seller may still modify or cancel.
	Pending,
	/// Window elapsed; waiting for a stock handler.
	Confirmed,
	/// A stock handler is preparing the order.
	Preparing,
	/// Prepared and waiting for a deliverer.
	Ready,
	/// Out with a deliverer.
	InDelivery,
	/// Handed to the customer.
	Delivered,
	/// Cancelled by the seller or the deliverer.
	Cancelled,
}

impl OrderStatus {
	/// Returns the string representation used in storage and APIs.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "pending",
			OrderStatus::Confirmed => "confirmed",
			OrderStatus::Preparing => "preparing",
			OrderStatus::Ready => "ready",
			OrderStatus::InDelivery => "in_delivery",
			OrderStatus::Delivered => "delivered",
			OrderStatus::Cancelled => "cancelled",
		}
	}

	/// Terminal statuses accept no further transitions.
	pub fn is_terminal(&self) -> bool {
		matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"pending" => Ok(Self::Pending),
			"confirmed" => Ok(Self::Confirmed),
			"preparing" => Ok(Self::Preparing),
			"ready" => Ok(Self::Ready),
			"in_delivery" => Ok(Self::InDelivery),
			"delivered" => Ok(Self::Delivered),
			"cancelled" => Ok(Self::Cancelled),
			other => Err(format!("Unknown order status: {}", other)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn product(price: Decimal) -> ProductRecord {
		ProductRecord {
			id: "p1".into(),
			name: "Rice".into(),
			unit: "kg".into(),
			price,
			stock: Some(Decimal::from(10)),
			is_validated: true,
			is_active: true,
		}
	}

	#[test]
	fn test_item_line_total_uses_snapshot_price() {
		let item =
			OrderItem::from_product(&product(Decimal::new(250, 2)), Decimal::new(15, 1)).unwrap();
		assert_eq!(item.line_total, Decimal::new(375, 2));
		assert_eq!(item.unit, "kg");
	}

	#[test]
	fn test_amounts_too_large_are_refused() {
		let priced = product(Decimal::new(3, 0));
		assert_eq!(
			OrderItem::from_product(&priced, Decimal::MAX),
			Err(AmountOverflow)
		);

		let line = OrderItem::from_product(&priced, Decimal::ONE).unwrap();
		let huge = OrderItem {
			line_total: Decimal::MAX,
			..line.clone()
		};
		let mut order: Order = serde_json::from_value(serde_json::json!({
			"id": "o1",
			"order_number": "CMD-20260302-0001",
			"seller_id": "s1",
			"seller_name": "Sara",
			"customer_name": "Atlas",
			"status": "pending",
			"items": [],
			"total_amount": "0",
			"is_paid": false,
			"created_at": "2026-03-02T09:30:00Z",
			"updated_at": "2026-03-02T09:30:00Z"
		}))
		.unwrap();
		order.replace_items(vec![line.clone()]).unwrap();
		assert_eq!(order.total_amount, Decimal::new(3, 0));

		assert_eq!(order.replace_items(vec![huge, line]), Err(AmountOverflow));
		assert_eq!(order.items.len(), 1);
		assert_eq!(order.total_amount, Decimal::new(3, 0));
	}

	#[test]
	fn test_status_round_trips_through_strings() {
		for status in [
			OrderStatus::Pending,
			OrderStatus::InDelivery,
			OrderStatus::Cancelled,
		] {
			assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
		}
		assert_eq!(
			serde_json::to_string(&OrderStatus::InDelivery).unwrap(),
			"\"in_delivery\""
		);
		assert!("shipped".parse::<OrderStatus>().is_err());
	}

	#[test]
	fn test_terminal_statuses() {
		assert!(OrderStatus::Delivered.is_terminal());
		assert!(OrderStatus::Cancelled.is_terminal());
		assert!(!OrderStatus::Ready.is_terminal());
	}
}
