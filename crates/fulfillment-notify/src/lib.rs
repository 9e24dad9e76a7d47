//! Notification delivery module for the order fulfillment system.
//!
//! Lifecycle transitions produce [`NotificationRequest`]s once they have
//! committed. This crate hands them to a configured sink without ever making
//! the transition wait for, or fail because of, the delivery.

use async_trait::async_trait;
use fulfillment_types::{truncate_id, ConfigSchema, ImplementationRegistry, NotificationRequest};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Semaphore};

/// Re-export implementations
pub mod implementations {
	pub mod log;
	pub mod memory;
}

/// Errors that can occur while delivering notifications.
#[derive(Debug, Error)]
pub enum NotificationError {
	/// The sink could not deliver the request.
	#[error("Delivery failed: {0}")]
	Delivery(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for notification sinks.
///
/// A sink receives one request at a time; storage, fan-out to devices and
/// read tracking are up to the implementation.
#[async_trait]
pub trait NotificationInterface: Send + Sync {
	/// Returns the configuration schema for this sink.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Delivers a single notification.
	async fn send(&self, request: &NotificationRequest) -> Result<(), NotificationError>;
}

/// Type alias for notification sink factory functions.
pub type NotificationFactory =
	fn(&toml::Value) -> Result<Box<dyn NotificationInterface>, NotificationError>;

/// Registry trait for notification implementations.
pub trait NotificationRegistry: ImplementationRegistry<Factory = NotificationFactory> {}

/// Get all registered notification implementations.
pub fn get_all_implementations() -> Vec<(&'static str, NotificationFactory)> {
	use implementations::{log, memory};

	vec![
		(log::Registry::NAME, log::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Service that hands notification requests to a sink in the background.
///
/// Each request is delivered by its own task. A semaphore bounds the number
/// of deliveries talking to the sink at once, and each delivery is abandoned
/// after `delivery_timeout`. Callers never wait for either.
pub struct NotificationService {
	sink: Arc<dyn NotificationInterface>,
	permits: Arc<Semaphore>,
	delivery_timeout: Duration,
	/// Requests handed off and not finished yet.
	pending: Arc<watch::Sender<usize>>,
}

/// Marks one handed-off request as finished when dropped.
struct PendingDelivery(Arc<watch::Sender<usize>>);

impl PendingDelivery {
	fn start(pending: &Arc<watch::Sender<usize>>) -> Self {
		pending.send_modify(|count| *count += 1);
		Self(pending.clone())
	}
}

impl Drop for PendingDelivery {
	fn drop(&mut self) {
		self.0.send_modify(|count| *count = count.saturating_sub(1));
	}
}

impl NotificationService {
	pub fn new(
		sink: Box<dyn NotificationInterface>,
		max_in_flight: usize,
		delivery_timeout: Duration,
	) -> Self {
		let (pending, _) = watch::channel(0);
		Self {
			sink: Arc::from(sink),
			permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
			delivery_timeout,
			pending: Arc::new(pending),
		}
	}

	/// Delivers a request and waits for the sink's answer.
	pub async fn deliver(&self, request: &NotificationRequest) -> Result<(), NotificationError> {
		self.sink.send(request).await
	}

	/// Hands requests off for background delivery and returns immediately.
	///
	/// Failures and timeouts are logged and otherwise dropped.
	pub fn dispatch(&self, requests: Vec<NotificationRequest>) {
		for request in requests {
			let pending = PendingDelivery::start(&self.pending);
			let sink = self.sink.clone();
			let permits = self.permits.clone();
			let timeout = self.delivery_timeout;
			tokio::spawn(async move {
				let _pending = pending;
				let Ok(_permit) = permits.acquire_owned().await else {
					return;
				};
				let error = match tokio::time::timeout(timeout, sink.send(&request)).await {
					Ok(Ok(())) => return,
					Ok(Err(e)) => e.to_string(),
					Err(_) => format!("no answer within {}s", timeout.as_secs()),
				};
				tracing::warn!(
					recipient = %request.recipient_user_id,
					kind = %request.kind,
					order_id = %request.related_order_id.as_deref().map(truncate_id).unwrap_or_default(),
					error = %error,
					"Notification delivery failed"
				);
			});
		}
	}

	/// Number of handed-off requests not finished yet.
	pub fn in_flight(&self) -> usize {
		*self.pending.borrow()
	}

	/// Waits until every delivery handed off so far has finished or timed out.
	pub async fn flush(&self) {
		let mut pending = self.pending.subscribe();
		// The sender lives in `self`, so the channel cannot close here.
		let _ = pending.wait_for(|count| *count == 0).await;
	}
}
