//! Notification sink that writes requests to the tracing log.
//!
//! Useful when the real notification collaborator runs elsewhere and reads
//! the structured log, and as the default sink of the service binary.

use crate::{NotificationError, NotificationFactory, NotificationInterface, NotificationRegistry};
use async_trait::async_trait;
use fulfillment_types::{
	truncate_id, ConfigSchema, Field, FieldType, ImplementationRegistry, NotificationRequest,
	Schema, ValidationError,
};

/// Level the sink logs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
	Info,
	Debug,
}

/// Sink logging every notification as a structured event.
pub struct LogNotifier {
	level: LogLevel,
}

impl LogNotifier {
	pub fn new(level: LogLevel) -> Self {
		Self { level }
	}
}

#[async_trait]
impl NotificationInterface for LogNotifier {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LogNotifierSchema)
	}

	async fn send(&self, request: &NotificationRequest) -> Result<(), NotificationError> {
		let order_id = request
			.related_order_id
			.as_deref()
			.map(truncate_id)
			.unwrap_or_default();
		match self.level {
			LogLevel::Info => tracing::info!(
				recipient = %request.recipient_user_id,
				kind = %request.kind,
				order_id = %order_id,
				title = %request.title,
				"{}",
				request.message
			),
			LogLevel::Debug => tracing::debug!(
				recipient = %request.recipient_user_id,
				kind = %request.kind,
				order_id = %order_id,
				title = %request.title,
				"{}",
				request.message
			),
		}
		Ok(())
	}
}

/// Configuration schema for LogNotifier.
pub struct LogNotifierSchema;

impl ConfigSchema for LogNotifierSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![Field::new("level", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some("info") | Some("debug") => Ok(()),
					_ => Err("level must be \"info\" or \"debug\"".to_string()),
				}
			})],
		);
		schema.validate(config)
	}
}

/// Factory function to create a log sink from configuration.
///
/// Configuration parameters:
/// - `level` (optional): `"info"` (default) or `"debug"`
pub fn create_notifier(
	config: &toml::Value,
) -> Result<Box<dyn NotificationInterface>, NotificationError> {
	LogNotifierSchema
		.validate(config)
		.map_err(|e| NotificationError::Configuration(e.to_string()))?;

	let level = match config.get("level").and_then(|v| v.as_str()) {
		Some("debug") => LogLevel::Debug,
		_ => LogLevel::Info,
	};
	Ok(Box::new(LogNotifier::new(level)))
}

/// Registry for the log notification implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "log";
	type Factory = NotificationFactory;

	fn factory() -> Self::Factory {
		create_notifier
	}
}

impl NotificationRegistry for Registry {}
