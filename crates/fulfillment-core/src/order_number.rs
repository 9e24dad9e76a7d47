//! Order number generation.
//!
//! Numbers look like `CMD-20250101093000123456-0001`: prefix, creation
//! timestamp with microseconds, and a sequence that restarts whenever the
//! timestamp changes.

use crate::state::OrderStore;
use chrono::{DateTime, Utc};
use fulfillment_storage::StorageError;
use tokio::sync::Mutex;

/// Candidates tried before giving up on a colliding timestamp.
const MAX_ATTEMPTS: u32 = 10_000;

/// Hands out unique order numbers for one prefix.
pub struct OrderNumberGenerator {
	prefix: String,
	// (timestamp part, last sequence handed out for it)
	sequence: Mutex<(String, u32)>,
}

impl OrderNumberGenerator {
	pub fn new(prefix: impl Into<String>) -> Self {
		Self {
			prefix: prefix.into(),
			sequence: Mutex::new((String::new(), 0)),
		}
	}

	async fn next_candidate(&self, now: DateTime<Utc>) -> String {
		let stamp = now.format("%Y%m%d%H%M%S%6f").to_string();
		let mut sequence = self.sequence.lock().await;
		if sequence.0 != stamp {
			*sequence = (stamp, 0);
		}
		sequence.1 += 1;
		format!("{}-{}-{:04}", self.prefix, sequence.0, sequence.1)
	}

	/// Returns a number no stored order uses yet.
	///
	/// Returns `None` when every candidate tried was taken.
	pub async fn generate(
		&self,
		orders: &OrderStore,
		now: DateTime<Utc>,
	) -> Result<Option<String>, StorageError> {
		for _ in 0..MAX_ATTEMPTS {
			let candidate = self.next_candidate(now).await;
			if !orders.number_exists(&candidate).await? {
				return Ok(Some(candidate));
			}
			tracing::debug!(order_number = %candidate, "Order number taken, trying next");
		}
		Ok(None)
	}
}
