//! Append-only audit trail of order transitions.
//!
//! The history of an order is stored as one list under
//! [`StorageKey::OrderHistory`], oldest first. Appends are staged in the
//! transition's batch, so an event exists exactly when its transition
//! committed.

use chrono::{DateTime, Utc};
use fulfillment_storage::{StorageBatch, StorageError, StorageService};
use fulfillment_types::{AuditAction, AuditEvent, StorageKey};
use std::sync::Arc;

/// Who performed a transition, as recorded.
#[derive(Debug, Clone, Copy)]
pub struct AuditActor<'a> {
	pub user_id: Option<&'a str>,
	pub role: &'a str,
}

/// Reads and appends order histories.
#[derive(Clone)]
pub struct AuditTrail {
	storage: Arc<StorageService>,
}

impl AuditTrail {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	async fn stored(&self, order_id: &str) -> Result<Vec<AuditEvent>, StorageError> {
		Ok(self
			.storage
			.retrieve_optional(StorageKey::OrderHistory.as_str(), order_id)
			.await?
			.unwrap_or_default())
	}

	/// Stages the next event of an order's history.
	///
	/// The caller must hold the order's lock.
	pub async fn record(
		&self,
		batch: &mut StorageBatch,
		order_id: &str,
		action: AuditAction,
		actor: AuditActor<'_>,
		description: impl Into<String>,
		at: DateTime<Utc>,
	) -> Result<AuditEvent, StorageError> {
		let mut history = self.stored(order_id).await?;
		let event = AuditEvent {
			sequence: history.len() as u64 + 1,
			order_id: order_id.to_string(),
			action,
			actor_id: actor.user_id.map(str::to_string),
			actor_role: actor.role.to_string(),
			description: description.into(),
			created_at: at,
		};
		history.push(event.clone());
		batch.put(StorageKey::OrderHistory.as_str(), order_id, &history)?;
		Ok(event)
	}

	/// History of an order, newest first.
	pub async fn list(&self, order_id: &str) -> Result<Vec<AuditEvent>, StorageError> {
		let mut history = self.stored(order_id).await?;
		history.reverse();
		Ok(history)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use fulfillment_storage::implementations::memory::MemoryStorage;
	use fulfillment_types::SYSTEM_ROLE;

	#[tokio::test]
	async fn test_events_are_sequenced_and_listed_newest_first() {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let trail = AuditTrail::new(storage.clone());
		let now = Utc::now();

		let seller = AuditActor {
			user_id: Some("s1"),
			role: "seller",
		};
		let system = AuditActor {
			user_id: None,
			role: SYSTEM_ROLE,
		};

		let mut batch = StorageBatch::new();
		trail
			.record(&mut batch, "o1", AuditAction::Created, seller, "Order created", now)
			.await
			.unwrap();
		storage.commit(batch).await.unwrap();

		let mut batch = StorageBatch::new();
		let event = trail
			.record(&mut batch, "o1", AuditAction::Confirmed, system, "Confirmed", now)
			.await
			.unwrap();
		assert_eq!(event.sequence, 2);

		// Nothing is visible before the batch commits.
		assert_eq!(trail.list("o1").await.unwrap().len(), 1);
		storage.commit(batch).await.unwrap();

		let history = trail.list("o1").await.unwrap();
		let actions: Vec<_> = history.iter().map(|e| e.action).collect();
		assert_eq!(actions, vec![AuditAction::Confirmed, AuditAction::Created]);
		assert_eq!(history[0].actor_id, None);
		assert_eq!(history[0].actor_role, SYSTEM_ROLE);
		assert!(trail.list("unknown").await.unwrap().is_empty());
	}
}
