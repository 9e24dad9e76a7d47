//! In-memory notification sink.
//!
//! Keeps delivered requests in a shared buffer so callers holding a clone
//! of the sink can inspect them.

use crate::{NotificationError, NotificationFactory, NotificationInterface, NotificationRegistry};
use async_trait::async_trait;
use fulfillment_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, NotificationRequest, Schema,
	ValidationError,
};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

const DEFAULT_CAPACITY: usize = 10_000;

/// Sink recording requests in memory, oldest dropped first when full.
#[derive(Clone)]
pub struct MemoryNotifier {
	sent: Arc<RwLock<VecDeque<NotificationRequest>>>,
	capacity: usize,
}

impl MemoryNotifier {
	pub fn new() -> Self {
		Self::with_capacity(DEFAULT_CAPACITY)
	}

	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			sent: Arc::new(RwLock::new(VecDeque::new())),
			capacity: capacity.max(1),
		}
	}

	/// Requests delivered so far, oldest first.
	pub async fn sent(&self) -> Vec<NotificationRequest> {
		self.sent.read().await.iter().cloned().collect()
	}

	/// Requests delivered to one recipient.
	pub async fn sent_to(&self, recipient_user_id: &str) -> Vec<NotificationRequest> {
		self.sent
			.read()
			.await
			.iter()
			.filter(|r| r.recipient_user_id == recipient_user_id)
			.cloned()
			.collect()
	}
}

impl Default for MemoryNotifier {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl NotificationInterface for MemoryNotifier {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryNotifierSchema)
	}

	async fn send(&self, request: &NotificationRequest) -> Result<(), NotificationError> {
		let mut sent = self.sent.write().await;
		if sent.len() == self.capacity {
			sent.pop_front();
		}
		sent.push_back(request.clone());
		Ok(())
	}
}

/// Configuration schema for MemoryNotifier.
pub struct MemoryNotifierSchema;

impl ConfigSchema for MemoryNotifierSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![Field::new(
				"capacity",
				FieldType::Integer {
					min: Some(1),
					max: None,
				},
			)],
		);
		schema.validate(config)
	}
}

/// Factory function to create a memory sink from configuration.
///
/// Configuration parameters:
/// - `capacity` (optional): number of requests kept, default 10000
pub fn create_notifier(
	config: &toml::Value,
) -> Result<Box<dyn NotificationInterface>, NotificationError> {
	MemoryNotifierSchema
		.validate(config)
		.map_err(|e| NotificationError::Configuration(e.to_string()))?;

	let capacity = config
		.get("capacity")
		.and_then(|v| v.as_integer())
		.and_then(|v| usize::try_from(v).ok())
		.unwrap_or(DEFAULT_CAPACITY);
	Ok(Box::new(MemoryNotifier::with_capacity(capacity)))
}

/// Registry for the memory notification implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = NotificationFactory;

	fn factory() -> Self::Factory {
		create_notifier
	}
}

impl NotificationRegistry for Registry {}
