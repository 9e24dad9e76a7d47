//! Product records shared with the catalog collaborator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product as maintained by the catalog.
///
/// The fulfillment core reads name, unit, price and flags when it builds
/// order lines and writes only `stock`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductRecord {
	pub id: String,
	pub name: String,
	pub unit: String,
	pub price: Decimal,
	/// Available quantity; `None` means stock is not tracked.
	#[serde(default)]
	pub stock: Option<Decimal>,
	#[serde(default)]
	pub is_validated: bool,
	#[serde(default = "default_active")]
	pub is_active: bool,
}

fn default_active() -> bool {
	true
}

impl ProductRecord {
	/// Only validated, active products can be ordered.
	pub fn is_orderable(&self) -> bool {
		self.is_validated && self.is_active
	}
}
