//! Per-record async locks.
//!
//! Locks are taken in one order: the order row, then the product rows in
//! sorted key order, then the order index. Each step is optional; creation
//! has no order row to lock and most transitions never touch the index.
//! Holders of a later lock never wait for an earlier one, so lock
//! acquisition cannot deadlock.

use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Guards held until the end of a transition.
#[must_use = "locks are released as soon as the guard is dropped"]
pub struct LockGuard {
	guards: Vec<OwnedMutexGuard<()>>,
}

impl LockGuard {
	pub fn len(&self) -> usize {
		self.guards.len()
	}

	pub fn is_empty(&self) -> bool {
		self.guards.is_empty()
	}
}

/// Table of named mutexes, created on first use.
#[derive(Default)]
pub struct LockTable {
	locks: DashMap<String, Arc<Mutex<()>>>,
}

impl LockTable {
	pub fn new() -> Self {
		Self::default()
	}

	fn mutex(&self, key: &str) -> Arc<Mutex<()>> {
		self.locks
			.entry(key.to_string())
			.or_insert_with(|| Arc::new(Mutex::new(())))
			.clone()
	}

	/// Locks a single key.
	pub async fn lock(&self, key: &str) -> LockGuard {
		let guard = self.mutex(key).lock_owned().await;
		LockGuard {
			guards: vec![guard],
		}
	}

	/// Locks every key once, in sorted order.
	pub async fn lock_all<I, S>(&self, keys: I) -> LockGuard
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let keys: BTreeSet<String> = keys.into_iter().map(Into::into).collect();
		let mut guards = Vec::with_capacity(keys.len());
		for key in keys {
			let mutex = self.mutex(&key);
			guards.push(mutex.lock_owned().await);
		}
		LockGuard { guards }
	}

	/// Number of keys ever locked.
	pub fn len(&self) -> usize {
		self.locks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.locks.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[tokio::test]
	async fn test_lock_all_dedups_keys() {
		let table = LockTable::new();
		let guard = table.lock_all(["products:b", "products:a", "products:b"]).await;
		assert_eq!(guard.len(), 2);
		assert_eq!(table.len(), 2);
	}

	#[tokio::test]
	async fn test_same_key_serializes() {
		let table = Arc::new(LockTable::new());
		let guard = table.lock("orders:1").await;

		let waiter = {
			let table = table.clone();
			tokio::spawn(async move {
				let _guard = table.lock("orders:1").await;
			})
		};
		tokio::time::sleep(Duration::from_millis(20)).await;
		assert!(!waiter.is_finished());

		drop(guard);
		tokio::time::timeout(Duration::from_secs(1), waiter)
			.await
			.unwrap()
			.unwrap();
	}
}
