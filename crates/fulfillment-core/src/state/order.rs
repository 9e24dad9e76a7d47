//! Order persistence.
//!
//! Orders live under [`StorageKey::Orders`], their numbers under
//! [`StorageKey::OrderNumbers`] and every id in the `orders` index, so the
//! read models can enumerate them. Writes are staged into the caller's batch.

use fulfillment_storage::{StorageBatch, StorageError, StorageService};
use fulfillment_types::{index, Order, StorageKey};
use std::sync::Arc;

/// Typed access to stored orders.
#[derive(Clone)]
pub struct OrderStore {
	storage: Arc<StorageService>,
}

impl OrderStore {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Gets an order by ID
	pub async fn get(&self, order_id: &str) -> Result<Option<Order>, StorageError> {
		self.storage
			.retrieve_optional(StorageKey::Orders.as_str(), order_id)
			.await
	}

	/// Ids of every order, oldest first.
	pub async fn ids(&self) -> Result<Vec<String>, StorageError> {
		Ok(self
			.storage
			.retrieve_optional(StorageKey::Indexes.as_str(), index::ORDERS)
			.await?
			.unwrap_or_default())
	}

	/// Every stored order, oldest first.
	pub async fn list(&self) -> Result<Vec<Order>, StorageError> {
		let mut orders = Vec::new();
		for id in self.ids().await? {
			if let Some(order) = self.get(&id).await? {
				orders.push(order);
			}
		}
		Ok(orders)
	}

	/// Whether an order number is already taken.
	pub async fn number_exists(&self, order_number: &str) -> Result<bool, StorageError> {
		self.storage
			.exists(StorageKey::OrderNumbers.as_str(), order_number)
			.await
	}

	/// Stages an update of an existing order.
	pub fn stage(&self, batch: &mut StorageBatch, order: &Order) -> Result<(), StorageError> {
		batch.put(StorageKey::Orders.as_str(), &order.id, order)
	}

	/// Stages a new order together with its number and index entry.
	///
	/// The caller must hold the lock of the `orders` index.
	pub async fn stage_new(
		&self,
		batch: &mut StorageBatch,
		order: &Order,
	) -> Result<(), StorageError> {
		let mut ids = self.ids().await?;
		ids.push(order.id.clone());

		batch.put(StorageKey::Orders.as_str(), &order.id, order)?;
		batch.put(
			StorageKey::OrderNumbers.as_str(),
			&order.order_number,
			&order.id,
		)?;
		batch.put(StorageKey::Indexes.as_str(), index::ORDERS, &ids)
	}
}
