//! Builder pattern for constructing fulfillment engines.
//!
//! Composes a FulfillmentEngine from the storage backend and notification
//! sink named in the configuration, created through factory functions.
//! Tests inject a clock and ready-made backends instead.

use crate::clock::{SystemClock, TimeSource};
use crate::engine::{event_bus::EventBus, FulfillmentEngine};
use crate::lifecycle::OrderLifecycle;
use crate::state::ConfirmationWindow;
use fulfillment_config::Config;
use fulfillment_notify::{NotificationFactory, NotificationInterface, NotificationService};
use fulfillment_storage::{StorageFactory, StorageInterface, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during engine construction.
///
/// These errors indicate problems with configuration or missing required
/// components when building an engine instance.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions by implementation name.
#[derive(Default)]
pub struct EngineFactories {
	pub storage_factories: HashMap<String, StorageFactory>,
	pub notification_factories: HashMap<String, NotificationFactory>,
}

/// Builder for constructing a FulfillmentEngine with pluggable implementations.
pub struct EngineBuilder {
	config: Config,
	clock: Option<Arc<dyn TimeSource>>,
	storage_backend: Option<Box<dyn StorageInterface>>,
	notification_sink: Option<Box<dyn NotificationInterface>>,
}

impl EngineBuilder {
	/// Creates a new EngineBuilder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self {
			config,
			clock: None,
			storage_backend: None,
			notification_sink: None,
		}
	}

	/// Uses `clock` instead of the system clock.
	pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
		self.clock = Some(clock);
		self
	}

	/// Uses `backend` instead of the configured primary storage.
	pub fn with_storage_backend(mut self, backend: Box<dyn StorageInterface>) -> Self {
		self.storage_backend = Some(backend);
		self
	}

	/// Uses `sink` instead of the configured primary notification sink.
	pub fn with_notification_sink(mut self, sink: Box<dyn NotificationInterface>) -> Self {
		self.notification_sink = Some(sink);
		self
	}

	/// Builds the FulfillmentEngine using factories for each component type.
	pub fn build(self, factories: EngineFactories) -> Result<FulfillmentEngine, BuilderError> {
		let storage_backend = match self.storage_backend {
			Some(backend) => {
				tracing::info!(component = "storage", implementation = "injected", "Loaded");
				backend
			},
			None => {
				let primary = &self.config.storage.primary;
				let config = self.config.storage.implementations.get(primary).ok_or_else(|| {
					BuilderError::Config(format!("Primary storage '{}' is not configured", primary))
				})?;
				let factory = factories.storage_factories.get(primary).ok_or_else(|| {
					BuilderError::MissingComponent(format!("storage implementation '{}'", primary))
				})?;
				match factory(config) {
					Ok(implementation) => {
						tracing::info!(component = "storage", implementation = %primary, "Loaded");
						implementation
					},
					Err(e) => {
						tracing::error!(
							component = "storage",
							implementation = %primary,
							error = %e,
							"Failed to create storage implementation"
						);
						return Err(BuilderError::Config(format!(
							"Failed to create storage implementation '{}': {}",
							primary, e
						)));
					},
				}
			},
		};
		let storage = Arc::new(StorageService::new(storage_backend));

		let sink = match self.notification_sink {
			Some(sink) => {
				tracing::info!(component = "notifications", implementation = "injected", "Loaded");
				sink
			},
			None => {
				let primary = &self.config.notifications.primary;
				let config = self
					.config
					.notifications
					.implementations
					.get(primary)
					.ok_or_else(|| {
						BuilderError::Config(format!(
							"Primary notifications '{}' is not configured",
							primary
						))
					})?;
				let factory = factories.notification_factories.get(primary).ok_or_else(|| {
					BuilderError::MissingComponent(format!(
						"notification implementation '{}'",
						primary
					))
				})?;
				match factory(config) {
					Ok(implementation) => {
						tracing::info!(component = "notifications", implementation = %primary, "Loaded");
						implementation
					},
					Err(e) => {
						tracing::error!(
							component = "notifications",
							implementation = %primary,
							error = %e,
							"Failed to create notification implementation"
						);
						return Err(BuilderError::Config(format!(
							"Failed to create notification implementation '{}': {}",
							primary, e
						)));
					},
				}
			},
		};
		let notifications = Arc::new(NotificationService::new(
			sink,
			self.config.notifications.max_in_flight,
			self.config.notifications.delivery_timeout(),
		));

		let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
		let window = ConfirmationWindow::new(self.config.engine.confirmation_window());
		let lifecycle = Arc::new(OrderLifecycle::new(
			storage.clone(),
			clock,
			window,
			&self.config.engine.order_number_prefix,
		));

		Ok(FulfillmentEngine::new(
			self.config,
			storage,
			notifications,
			lifecycle,
			EventBus::default(),
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use fulfillment_config::builders::config::ConfigBuilder;

	#[test]
	fn test_build_from_configured_implementations() {
		let config = ConfigBuilder::new()
			.notifications_primary("log".to_string())
			.build();
		let factories = EngineFactories {
			storage_factories: HashMap::from([(
				"memory".to_string(),
				fulfillment_storage::implementations::memory::create_storage as StorageFactory,
			)]),
			notification_factories: HashMap::from([(
				"log".to_string(),
				fulfillment_notify::implementations::log::create_notifier as NotificationFactory,
			)]),
		};
		let engine = EngineBuilder::new(config).build(factories).unwrap();
		assert_eq!(engine.window().seconds(), 180);
	}

	#[test]
	fn test_unknown_factory_is_reported() {
		let config = ConfigBuilder::new().build();
		let result = EngineBuilder::new(config).build(EngineFactories::default());
		assert!(matches!(result, Err(BuilderError::MissingComponent(_))));
	}
}
