//! Request payloads and read models of the engine operations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Order, OrderStatus};

/// One requested line of a new or modified order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemRequest {
	pub product_id: String,
	pub quantity: Decimal,
}

impl ItemRequest {
	pub fn new(product_id: impl Into<String>, quantity: Decimal) -> Self {
		Self {
			product_id: product_id.into(),
			quantity,
		}
	}
}

/// Payload of the create transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrder {
	pub customer_name: String,
	pub items: Vec<ItemRequest>,
}

/// Payload of the modify transition.
///
/// Absent fields are left unchanged; a present item list replaces the whole
/// item set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModifyOrder {
	#[serde(default)]
	pub customer_name: Option<String>,
	#[serde(default)]
	pub items: Option<Vec<ItemRequest>>,
}

/// An order together with its window-derived fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSnapshot {
	#[serde(flatten)]
	pub order: Order,
	pub elapsed_seconds: i64,
	pub remaining_seconds: i64,
	pub can_modify: bool,
	pub can_cancel: bool,
}

/// Result of the on-demand status check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderStatusReport {
	pub order_id: String,
	pub order_number: String,
	pub status: OrderStatus,
	pub elapsed_seconds: i64,
	pub remaining_seconds: i64,
	pub can_modify: bool,
	pub can_cancel: bool,
	/// True when the order is (now) confirmed.
	pub confirmed: bool,
}

/// A deliverer as listed for assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DelivererSummary {
	pub id: String,
	pub username: String,
	pub full_name: String,
	/// Orders currently `in_delivery` with this deliverer.
	pub active_deliveries: usize,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub latitude: Option<Decimal>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub longitude: Option<Decimal>,
}
