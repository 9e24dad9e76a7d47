//! TOML configuration of the fulfillment engine.
//!
//! A configuration has three sections: `[engine]` for the confirmation window,
//! sweep cadence and order numbering, `[storage]` and `[notifications]` naming
//! the pluggable backends. Values may reference environment variables as
//! `${NAME}` or `${NAME:-fallback}`, and a file may pull sections from other
//! files through a top-level `include`.

mod loader;

#[cfg(any(test, feature = "testing"))]
pub mod builders {
	pub mod config;
}

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// The text is not valid TOML or does not match [`Config`].
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Well-formed but unusable values.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// The Display form echoes the offending source.
		ConfigError::Parse(err.message().to_owned())
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	pub engine: EngineConfig,
	pub storage: StorageConfig,
	pub notifications: NotificationConfig,
}

/// `[engine]`: timing and numbering of one fulfillment desk.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
	/// Name used in logs.
	pub id: String,
	/// Seconds after creation during which the seller may still modify or
	/// cancel a pending order.
	#[serde(default = "default_confirmation_window_seconds")]
	pub confirmation_window_seconds: u64,
	/// Seconds between two periodic sweeps of pending orders.
	#[serde(default = "default_sweep_interval_seconds")]
	pub sweep_interval_seconds: u64,
	/// Prefix of generated order numbers.
	#[serde(default = "default_order_number_prefix")]
	pub order_number_prefix: String,
}

impl EngineConfig {
	pub fn confirmation_window(&self) -> Duration {
		Duration::from_secs(self.confirmation_window_seconds)
	}

	pub fn sweep_interval(&self) -> Duration {
		Duration::from_secs(self.sweep_interval_seconds)
	}
}

fn default_confirmation_window_seconds() -> u64 {
	180
}

fn default_sweep_interval_seconds() -> u64 {
	5
}

fn default_order_number_prefix() -> String {
	"CMD".to_string()
}

/// `[storage]`: the backend orders and audit entries are kept in.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Key of `implementations` the engine uses.
	pub primary: String,
	/// Backend settings by backend name.
	pub implementations: HashMap<String, toml::Value>,
}

/// `[notifications]`: where stakeholder messages are delivered.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
	/// Key of `implementations` the engine uses.
	pub primary: String,
	/// Maximum number of notifications being delivered at once.
	#[serde(default = "default_max_in_flight")]
	pub max_in_flight: usize,
	/// Seconds a single delivery may take before it is abandoned.
	#[serde(default = "default_delivery_timeout_seconds")]
	pub delivery_timeout_seconds: u64,
	/// Sink settings by sink name.
	pub implementations: HashMap<String, toml::Value>,
}

fn default_max_in_flight() -> usize {
	100
}

fn default_delivery_timeout_seconds() -> u64 {
	30
}

impl NotificationConfig {
	pub fn delivery_timeout(&self) -> Duration {
		Duration::from_secs(self.delivery_timeout_seconds)
	}
}

/// Largest configuration text accepted for environment substitution.
const MAX_CONFIG_BYTES: usize = 1024 * 1024;

/// Substitutes `${NAME}` and `${NAME:-fallback}` with environment values.
///
/// A reference to an unset variable without a fallback is an error.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	if input.len() > MAX_CONFIG_BYTES {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_CONFIG_BYTES
		)));
	}

	let pattern = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut missing = None;
	let resolved = pattern.replace_all(input, |caps: &regex::Captures<'_>| {
		let name = &caps[1];
		match (std::env::var(name), caps.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(fallback)) => fallback.as_str().to_string(),
			(Err(_), None) => {
				missing.get_or_insert_with(|| name.to_string());
				String::new()
			},
		}
	});

	match missing {
		Some(name) => Err(ConfigError::Validation(format!(
			"Environment variable '{}' not found",
			name
		))),
		None => Ok(resolved.into_owned()),
	}
}

impl Config {
	/// Reads `path` and every file it includes, relative to its directory.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let entry = Path::new(path);
		let Some(name) = entry.file_name() else {
			return Err(ConfigError::Validation(format!("Invalid path: {}", path)));
		};
		let dir = entry.parent().unwrap_or_else(|| Path::new("."));
		loader::ConfigLoader::new(dir).load_config(name).await
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.engine.id.is_empty() {
			return Err(ConfigError::Validation("Engine ID cannot be empty".into()));
		}

		if !(1..=86400).contains(&self.engine.confirmation_window_seconds) {
			return Err(ConfigError::Validation(
				"confirmation_window_seconds must be between 1 and 86400".into(),
			));
		}
		if !(1..=3600).contains(&self.engine.sweep_interval_seconds) {
			return Err(ConfigError::Validation(
				"sweep_interval_seconds must be between 1 and 3600".into(),
			));
		}

		let prefix = &self.engine.order_number_prefix;
		if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
			return Err(ConfigError::Validation(format!(
				"order_number_prefix '{}' must be a non-empty alphanumeric string",
				prefix
			)));
		}

		validate_primary(
			"storage",
			&self.storage.primary,
			&self.storage.implementations,
		)?;
		validate_primary(
			"notifications",
			&self.notifications.primary,
			&self.notifications.implementations,
		)?;

		if self.notifications.max_in_flight == 0 {
			return Err(ConfigError::Validation(
				"notifications max_in_flight must be greater than 0".into(),
			));
		}
		if !(1..=3600).contains(&self.notifications.delivery_timeout_seconds) {
			return Err(ConfigError::Validation(
				"notifications delivery_timeout_seconds must be between 1 and 3600".into(),
			));
		}

		Ok(())
	}
}

fn validate_primary(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if implementations.is_empty() {
		return Err(ConfigError::Validation(format!(
			"At least one {} implementation must be configured",
			section
		)));
	}
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

/// Parses a single file's text. Environment references are resolved first
/// and the result is validated.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MINIMAL: &str = r#"
[engine]
id = "central-desk"

[storage]
primary = "memory"
[storage.implementations.memory]

[notifications]
primary = "log"
[notifications.implementations.log]
"#;

	#[test]
	fn test_env_references_resolved() {
		std::env::set_var("DESK_CITY", "casablanca");
		std::env::set_var("DESK_ZONE", "7");

		let resolved = resolve_env_vars("id = \"${DESK_CITY}-${DESK_ZONE}\"").unwrap();
		assert_eq!(resolved, "id = \"casablanca-7\"");

		std::env::remove_var("DESK_CITY");
		std::env::remove_var("DESK_ZONE");
	}

	#[test]
	fn test_env_fallback_and_missing() {
		let resolved = resolve_env_vars("prefix = \"${DESK_UNSET_PREFIX:-CMD}\"").unwrap();
		assert_eq!(resolved, "prefix = \"CMD\"");

		let err = resolve_env_vars("id = \"${DESK_UNSET_ID}\"").unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
		assert!(err.to_string().contains("DESK_UNSET_ID"));
	}

	#[test]
	fn test_defaults_applied() {
		let config: Config = MINIMAL.parse().unwrap();
		assert_eq!(config.engine.confirmation_window_seconds, 180);
		assert_eq!(config.engine.sweep_interval_seconds, 5);
		assert_eq!(config.engine.order_number_prefix, "CMD");
		assert_eq!(config.notifications.max_in_flight, 100);
		assert_eq!(config.notifications.delivery_timeout(), Duration::from_secs(30));
		assert_eq!(config.engine.confirmation_window(), Duration::from_secs(180));
	}

	#[test]
	fn test_config_with_env_vars() {
		std::env::set_var("TEST_ENGINE_ID", "north-desk");

		let config_str = r#"
[engine]
id = "${TEST_ENGINE_ID}"
confirmation_window_seconds = ${TEST_WINDOW_SECONDS:-90}

[storage]
primary = "memory"
[storage.implementations.memory]

[notifications]
primary = "memory"
[notifications.implementations.memory]
"#;

		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.engine.id, "north-desk");
		assert_eq!(config.engine.confirmation_window_seconds, 90);

		std::env::remove_var("TEST_ENGINE_ID");
	}

	#[test]
	fn test_window_bounds_rejected() {
		let config_str = MINIMAL.replace(
			"id = \"central-desk\"",
			"id = \"central-desk\"\nconfirmation_window_seconds = 0",
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("confirmation_window_seconds"));

		let config_str = MINIMAL.replace(
			"id = \"central-desk\"",
			"id = \"central-desk\"\nsweep_interval_seconds = 7200",
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("sweep_interval_seconds"));
	}

	#[test]
	fn test_invalid_prefix_rejected() {
		let config_str = MINIMAL.replace(
			"id = \"central-desk\"",
			"id = \"central-desk\"\norder_number_prefix = \"CMD-\"",
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("order_number_prefix"));
	}

	#[test]
	fn test_unknown_primary_rejected() {
		let config_str = MINIMAL.replace("primary = \"log\"", "primary = \"push\"");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err
			.to_string()
			.contains("Primary notifications 'push' not found"));
	}

	#[test]
	fn test_zero_in_flight_rejected() {
		let config_str = MINIMAL.replace(
			"primary = \"log\"",
			"primary = \"log\"\nmax_in_flight = 0",
		);
		assert!(Config::from_str(&config_str).is_err());
	}

	#[test]
	fn test_delivery_timeout_bounds() {
		let config_str = MINIMAL.replace(
			"primary = \"log\"",
			"primary = \"log\"\ndelivery_timeout_seconds = 0",
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("delivery_timeout_seconds"));
	}
}
