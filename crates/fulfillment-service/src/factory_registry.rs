//! Maps backend names found in the configuration to the factories that
//! build them.

use fulfillment_config::Config;
use fulfillment_core::{EngineBuilder, EngineFactories, FulfillmentEngine};
use fulfillment_notify::NotificationFactory;
use fulfillment_storage::StorageFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Every storage and notification implementation compiled into the binary.
pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
	pub notifications: HashMap<String, NotificationFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			storage: HashMap::new(),
			notifications: HashMap::new(),
		}
	}

	pub fn register_storage(&mut self, name: impl Into<String>, factory: StorageFactory) {
		self.storage.insert(name.into(), factory);
	}

	pub fn register_notification(&mut self, name: impl Into<String>, factory: NotificationFactory) {
		self.notifications.insert(name.into(), factory);
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Returns the process-wide registry, filling it on first use.
pub fn initialize_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in fulfillment_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.register_storage(name, factory);
		}

		for (name, factory) in fulfillment_notify::get_all_implementations() {
			tracing::debug!("Registering notification implementation: {}", name);
			registry.register_notification(name, factory);
		}

		registry
	})
}

/// Picks the factory of every configured implementation, failing on names
/// the registry does not know.
macro_rules! build_factories {
	($registry:expr, $config_impls:expr, $registry_field:ident, $type_name:literal) => {{
		let mut factories = HashMap::new();
		for name in $config_impls.keys() {
			if let Some(factory) = $registry.$registry_field.get(name) {
				factories.insert(name.clone(), *factory);
			} else {
				let mut available: Vec<_> = $registry.$registry_field.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					$type_name,
					name,
					available.join(", ")
				)
				.into());
			}
		}
		factories
	}};
}

pub fn build_engine_from_config(
	config: Config,
) -> Result<FulfillmentEngine, Box<dyn std::error::Error>> {
	let registry = initialize_registry();

	let storage_factories =
		build_factories!(registry, config.storage.implementations, storage, "storage");
	let notification_factories = build_factories!(
		registry,
		config.notifications.implementations,
		notifications,
		"notification"
	);

	let factories = EngineFactories {
		storage_factories,
		notification_factories,
	};

	Ok(EngineBuilder::new(config).build(factories)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use fulfillment_config::builders::config::ConfigBuilder;

	#[test]
	fn test_registry_knows_shipped_implementations() {
		let registry = initialize_registry();
		assert!(registry.storage.contains_key("memory"));
		assert!(registry.notifications.contains_key("log"));
		assert!(registry.notifications.contains_key("memory"));
	}

	#[test]
	fn test_build_engine_from_config() {
		let config = ConfigBuilder::new()
			.engine_id("desk-test".to_string())
			.notifications_primary("log".to_string())
			.build();
		let engine = build_engine_from_config(config).unwrap();
		assert_eq!(engine.config().engine.id, "desk-test");
	}

	#[test]
	fn test_unknown_implementation_is_rejected() {
		let config = ConfigBuilder::new()
			.storage_primary("postgres".to_string())
			.build();
		let err = build_engine_from_config(config).err().unwrap();
		assert_eq!(
			err.to_string(),
			"Unknown storage implementation 'postgres'. Available: [memory]"
		);
	}
}
