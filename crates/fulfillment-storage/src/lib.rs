//! Persistence for orders, audit trails, products and users.
//!
//! Backends only see opaque bytes under `namespace:id` keys; [`StorageService`]
//! layers JSON records on top. Writes that must become visible together go
//! through a [`StorageBatch`].

use async_trait::async_trait;
use fulfillment_types::{ConfigSchema, ImplementationRegistry};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub mod implementations {
	pub mod memory;
}

#[derive(Debug, Error)]
pub enum StorageError {
	#[error("Not found")]
	NotFound,
	/// A record did not encode or decode as JSON.
	#[error("Serialization error: {0}")]
	Serialization(String),
	#[error("Backend error: {0}")]
	Backend(String),
	/// Backend settings were rejected by its schema.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// A single write of a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
	Put { key: String, value: Vec<u8> },
	Delete { key: String },
}

/// Byte-level key/value backend.
///
/// `commit` must be atomic: a concurrent reader sees none or all of a batch.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Missing keys are [`StorageError::NotFound`].
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deleting a missing key is not an error.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	async fn commit(&self, ops: Vec<BatchOp>) -> Result<(), StorageError>;

	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Builds a backend from its `[storage.implementations.<name>]` table.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Every backend shipped with this crate, keyed by configuration name.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::memory;

	vec![(memory::Registry::NAME, memory::Registry::factory())]
}

fn key(namespace: &str, id: &str) -> String {
	format!("{}:{}", namespace, id)
}

fn encode<T: Serialize>(data: &T) -> Result<Vec<u8>, StorageError> {
	serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
	serde_json::from_slice(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Writes collected for one atomic commit.
///
/// Later writes to the same key win, as they would if applied one by one.
#[derive(Debug, Default)]
pub struct StorageBatch {
	ops: Vec<BatchOp>,
}

impl StorageBatch {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn put<T: Serialize>(
		&mut self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let value = encode(data)?;
		self.ops.push(BatchOp::Put {
			key: key(namespace, id),
			value,
		});
		Ok(())
	}

	pub fn delete(&mut self, namespace: &str, id: &str) {
		self.ops.push(BatchOp::Delete {
			key: key(namespace, id),
		});
	}

	pub fn len(&self) -> usize {
		self.ops.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ops.is_empty()
	}
}

/// Typed JSON records over a byte backend.
pub struct StorageService {
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Writes one record outside of any batch.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		self.backend.set_bytes(&key(namespace, id), encode(data)?).await
	}

	/// Reads one record; a missing key is [`StorageError::NotFound`].
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		decode(&self.backend.get_bytes(&key(namespace, id)).await?)
	}

	pub async fn retrieve_optional<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<Option<T>, StorageError> {
		match self.backend.get_bytes(&key(namespace, id)).await {
			Ok(bytes) => decode(&bytes).map(Some),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}

	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&key(namespace, id)).await
	}

	/// Applies a batch in one backend call. Empty batches are skipped.
	pub async fn commit(&self, batch: StorageBatch) -> Result<(), StorageError> {
		if batch.is_empty() {
			return Ok(());
		}
		tracing::trace!(writes = batch.len(), "Committing storage batch");
		self.backend.commit(batch.ops).await
	}
}
