//! Read access to the records owned by external collaborators.
//!
//! Product and user management live outside the engine. The engine reads
//! products and users from the shared store; `upsert` is the entry point the
//! managing side (and tests) use to publish records.

use fulfillment_storage::{StorageError, StorageService};
use fulfillment_types::{index, ProductRecord, Role, StorageKey, UserRecord};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Product records by id.
#[derive(Clone)]
pub struct ProductCatalog {
	storage: Arc<StorageService>,
}

impl ProductCatalog {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	pub async fn get_product(&self, product_id: &str) -> Result<Option<ProductRecord>, StorageError> {
		self.storage
			.retrieve_optional(StorageKey::Products.as_str(), product_id)
			.await
	}

	/// Creates or replaces a product record.
	pub async fn upsert(&self, product: &ProductRecord) -> Result<(), StorageError> {
		self.storage
			.store(StorageKey::Products.as_str(), &product.id, product)
			.await
	}
}

/// User records by id and by role.
#[derive(Clone)]
pub struct UserDirectory {
	storage: Arc<StorageService>,
	index_lock: Arc<Mutex<()>>,
}

impl UserDirectory {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			storage,
			index_lock: Arc::new(Mutex::new(())),
		}
	}

	pub async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, StorageError> {
		self.storage
			.retrieve_optional(StorageKey::Users.as_str(), user_id)
			.await
	}

	async fn ids(&self) -> Result<Vec<String>, StorageError> {
		Ok(self
			.storage
			.retrieve_optional(StorageKey::Indexes.as_str(), index::USERS)
			.await?
			.unwrap_or_default())
	}

	/// Creates or replaces a user record.
	pub async fn upsert(&self, user: &UserRecord) -> Result<(), StorageError> {
		let _guard = self.index_lock.lock().await;
		self.storage
			.store(StorageKey::Users.as_str(), &user.id, user)
			.await?;

		let mut ids = self.ids().await?;
		if !ids.contains(&user.id) {
			ids.push(user.id.clone());
			self.storage
				.store(StorageKey::Indexes.as_str(), index::USERS, &ids)
				.await?;
		}
		Ok(())
	}

	/// Every user, in registration order.
	pub async fn list_all(&self) -> Result<Vec<UserRecord>, StorageError> {
		let mut users = Vec::new();
		for id in self.ids().await? {
			if let Some(user) = self.get_user(&id).await? {
				users.push(user);
			}
		}
		Ok(users)
	}

	/// Every user holding `role`, active or not.
	pub async fn list_by_role(&self, role: Role) -> Result<Vec<UserRecord>, StorageError> {
		Ok(self
			.list_all()
			.await?
			.into_iter()
			.filter(|user| user.role == role)
			.collect())
	}

	/// Active users holding `role`.
	pub async fn list_active(&self, role: Role) -> Result<Vec<UserRecord>, StorageError> {
		Ok(self
			.list_by_role(role)
			.await?
			.into_iter()
			.filter(|user| user.is_active_account)
			.collect())
	}
}
