//! Configuration builder for creating test and development configurations.
//!
//! This module provides utilities for constructing Config instances with
//! sensible defaults, particularly useful for testing scenarios.

use crate::{Config, EngineConfig, NotificationConfig, StorageConfig};
use std::collections::HashMap;

/// Builder for creating `Config` instances with a fluent API.
///
/// Defaults to in-memory storage and the in-memory notification sink.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	engine_id: String,
	confirmation_window_seconds: u64,
	sweep_interval_seconds: u64,
	order_number_prefix: String,
	storage_primary: String,
	notifications_primary: String,
	max_in_flight: usize,
	delivery_timeout_seconds: u64,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	/// Creates a new `ConfigBuilder` with default values suitable for testing.
	pub fn new() -> Self {
		Self {
			engine_id: "test-engine".to_string(),
			confirmation_window_seconds: 180,
			sweep_interval_seconds: 1,
			order_number_prefix: "CMD".to_string(),
			storage_primary: "memory".to_string(),
			notifications_primary: "memory".to_string(),
			max_in_flight: 16,
			delivery_timeout_seconds: 5,
		}
	}

	pub fn engine_id(mut self, id: String) -> Self {
		self.engine_id = id;
		self
	}

	pub fn confirmation_window_seconds(mut self, seconds: u64) -> Self {
		self.confirmation_window_seconds = seconds;
		self
	}

	pub fn sweep_interval_seconds(mut self, seconds: u64) -> Self {
		self.sweep_interval_seconds = seconds;
		self
	}

	pub fn order_number_prefix(mut self, prefix: String) -> Self {
		self.order_number_prefix = prefix;
		self
	}

	pub fn storage_primary(mut self, primary: String) -> Self {
		self.storage_primary = primary;
		self
	}

	pub fn notifications_primary(mut self, primary: String) -> Self {
		self.notifications_primary = primary;
		self
	}

	pub fn max_in_flight(mut self, max: usize) -> Self {
		self.max_in_flight = max;
		self
	}

	pub fn delivery_timeout_seconds(mut self, seconds: u64) -> Self {
		self.delivery_timeout_seconds = seconds;
		self
	}

	/// Builds the `Config` with the configured values.
	///
	/// Each primary implementation gets an empty settings table.
	pub fn build(self) -> Config {
		let empty = || toml::Value::Table(toml::map::Map::new());
		Config {
			engine: EngineConfig {
				id: self.engine_id,
				confirmation_window_seconds: self.confirmation_window_seconds,
				sweep_interval_seconds: self.sweep_interval_seconds,
				order_number_prefix: self.order_number_prefix,
			},
			storage: StorageConfig {
				implementations: HashMap::from([(self.storage_primary.clone(), empty())]),
				primary: self.storage_primary,
			},
			notifications: NotificationConfig {
				implementations: HashMap::from([(self.notifications_primary.clone(), empty())]),
				primary: self.notifications_primary,
				max_in_flight: self.max_in_flight,
				delivery_timeout_seconds: self.delivery_timeout_seconds,
			},
		}
	}
}
