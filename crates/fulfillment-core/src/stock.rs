//! Stock reservation against working copies of product rows.
//!
//! A [`StockLedger`] is loaded with the products a transition touches. Each
//! reservation and release changes only the working copy; the rows are
//! written back by [`StockLedger::stage`] as part of the transition's batch.
//! A failed multi-item reservation leaves the working copies as they were.

use fulfillment_storage::{StorageBatch, StorageError};
use fulfillment_types::{ProductRecord, StorageKey};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Reasons a stock change is refused.
#[derive(Debug, Error, PartialEq)]
pub enum StockError {
	#[error("Product {0} is not loaded")]
	UnknownProduct(String),
	#[error("Insufficient stock for {product}: {available} available, {requested} requested")]
	Insufficient {
		product: String,
		available: Decimal,
		requested: Decimal,
	},
	#[error("Stock of {0} is too large to take {1} back")]
	Overflow(String, Decimal),
}

/// Staged per-product availability.
#[derive(Debug, Default)]
pub struct StockLedger {
	rows: BTreeMap<String, ProductRecord>,
	touched: BTreeSet<String>,
}

impl StockLedger {
	pub fn new(products: impl IntoIterator<Item = ProductRecord>) -> Self {
		Self {
			rows: products.into_iter().map(|p| (p.id.clone(), p)).collect(),
			touched: BTreeSet::new(),
		}
	}

	/// The working copy of a product.
	pub fn product(&self, product_id: &str) -> Option<&ProductRecord> {
		self.rows.get(product_id)
	}

	/// Takes `quantity` out of the available stock.
	///
	/// Untracked stock accepts any quantity.
	pub fn reserve(&mut self, product_id: &str, quantity: Decimal) -> Result<(), StockError> {
		let row = self
			.rows
			.get_mut(product_id)
			.ok_or_else(|| StockError::UnknownProduct(product_id.to_string()))?;
		let Some(available) = row.stock else {
			return Ok(());
		};
		if available < quantity {
			return Err(StockError::Insufficient {
				product: row.name.clone(),
				available,
				requested: quantity,
			});
		}
		row.stock = Some(available - quantity);
		self.touched.insert(product_id.to_string());
		Ok(())
	}

	/// Puts `quantity` back into the available stock.
	pub fn release(&mut self, product_id: &str, quantity: Decimal) -> Result<(), StockError> {
		let row = self
			.rows
			.get_mut(product_id)
			.ok_or_else(|| StockError::UnknownProduct(product_id.to_string()))?;
		if let Some(available) = row.stock {
			let restored = available
				.checked_add(quantity)
				.ok_or_else(|| StockError::Overflow(row.name.clone(), quantity))?;
			row.stock = Some(restored);
			self.touched.insert(product_id.to_string());
		}
		Ok(())
	}

	/// Reserves every line or none of them.
	///
	/// Lines of the same product draw from the same row.
	pub fn reserve_all<'a, I>(&mut self, lines: I) -> Result<(), StockError>
	where
		I: IntoIterator<Item = (&'a str, Decimal)>,
	{
		let saved_rows = self.rows.clone();
		let saved_touched = self.touched.clone();
		for (product_id, quantity) in lines {
			if let Err(e) = self.reserve(product_id, quantity) {
				self.rows = saved_rows;
				self.touched = saved_touched;
				return Err(e);
			}
		}
		Ok(())
	}

	/// Current staged availability; `None` when untracked or not loaded.
	pub fn available(&self, product_id: &str) -> Option<Decimal> {
		self.rows.get(product_id).and_then(|row| row.stock)
	}

	/// Stages every changed row into the batch.
	pub fn stage(&self, batch: &mut StorageBatch) -> Result<(), StorageError> {
		for product_id in &self.touched {
			if let Some(row) = self.rows.get(product_id) {
				batch.put(StorageKey::Products.as_str(), product_id, row)?;
			}
		}
		Ok(())
	}

	pub fn touched(&self) -> usize {
		self.touched.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;

	fn product(id: &str, stock: Option<Decimal>) -> ProductRecord {
		ProductRecord {
			id: id.into(),
			name: id.to_uppercase(),
			unit: "kg".into(),
			price: dec!(1.00),
			stock,
			is_validated: true,
			is_active: true,
		}
	}

	#[test]
	fn test_reserve_and_release() {
		let mut ledger = StockLedger::new([product("a", Some(dec!(10)))]);
		ledger.reserve("a", dec!(2.5)).unwrap();
		assert_eq!(ledger.available("a"), Some(dec!(7.5)));
		ledger.release("a", dec!(2.5)).unwrap();
		assert_eq!(ledger.available("a"), Some(dec!(10)));
	}

	#[test]
	fn test_failed_reserve_all_rolls_back() {
		let mut ledger = StockLedger::new([
			product("a", Some(dec!(10))),
			product("b", Some(dec!(1))),
		]);
		let err = ledger
			.reserve_all([("a", dec!(3)), ("b", dec!(2))])
			.unwrap_err();
		assert_eq!(
			err,
			StockError::Insufficient {
				product: "B".into(),
				available: dec!(1),
				requested: dec!(2),
			}
		);
		assert_eq!(ledger.available("a"), Some(dec!(10)));
		assert_eq!(ledger.touched(), 0);
	}

	#[test]
	fn test_duplicate_lines_share_the_row() {
		let mut ledger = StockLedger::new([product("a", Some(dec!(5)))]);
		assert!(ledger
			.reserve_all([("a", dec!(3)), ("a", dec!(3))])
			.is_err());
		ledger.reserve_all([("a", dec!(3)), ("a", dec!(2))]).unwrap();
		assert_eq!(ledger.available("a"), Some(dec!(0)));
	}

	#[test]
	fn test_untracked_stock_is_unlimited() {
		let mut ledger = StockLedger::new([product("a", None)]);
		ledger.reserve("a", dec!(1000)).unwrap();
		ledger.release("a", dec!(1000)).unwrap();
		assert_eq!(ledger.available("a"), None);
		assert_eq!(ledger.touched(), 0);

		let mut batch = StorageBatch::new();
		ledger.stage(&mut batch).unwrap();
		assert!(batch.is_empty());
	}

	#[test]
	fn test_release_overflow_keeps_the_row() {
		let mut ledger = StockLedger::new([product("a", Some(Decimal::MAX))]);
		assert_eq!(
			ledger.release("a", dec!(1)),
			Err(StockError::Overflow("A".into(), dec!(1)))
		);
		assert_eq!(ledger.available("a"), Some(Decimal::MAX));
		assert_eq!(ledger.touched(), 0);
	}

	#[test]
	fn test_unknown_product() {
		let mut ledger = StockLedger::default();
		assert_eq!(
			ledger.reserve("x", dec!(1)),
			Err(StockError::UnknownProduct("x".into()))
		);
	}
}
