//! Lifecycle management for the fulfillment engine.
//!
//! Handles initialization and shutdown procedures for the engine, ensuring
//! orders that expired while it was down get confirmed and that pending
//! notifications are handed off before exit.

use super::{EngineError, FulfillmentEngine};

impl FulfillmentEngine {
	/// Confirms orders whose window elapsed while the engine was down.
	pub async fn initialize(&self) -> Result<(), EngineError> {
		tracing::info!(
			engine_id = %self.config.engine.id,
			window_seconds = self.window().seconds(),
			"Initializing fulfillment engine"
		);

		let summary = self
			.sweeper
			.sweep_pending()
			.await
			.map_err(|e| EngineError::Service(e.to_string()))?;
		if summary.confirmed > 0 {
			tracing::info!(
				confirmed = summary.confirmed,
				"Confirmed orders that expired while offline"
			);
		}
		Ok(())
	}

	/// Waits for in-flight notifications.
	pub async fn shutdown(&self) -> Result<(), EngineError> {
		tracing::info!("Shutting down fulfillment engine");
		self.notifications.flush().await;
		Ok(())
	}
}
