//! Main entry point for the order fulfillment service.
//!
//! This binary runs the fulfillment engine: it loads the configuration,
//! wires the configured storage and notification implementations, confirms
//! orders whose window elapsed while it was down, and then sweeps pending
//! orders until interrupted.

use clap::Parser;
use fulfillment_config::Config;
use std::path::PathBuf;

mod factory_registry;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", env = "FULFILLMENT_CONFIG")]
	config: PathBuf,

	/// Default filter when RUST_LOG is unset
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started fulfillment service");

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.engine.id);

	let engine = factory_registry::build_engine_from_config(config)?;

	engine.initialize().await?;
	engine.run().await?;
	engine.shutdown().await?;

	tracing::info!("Stopped fulfillment service");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	#[test]
	fn test_args_default_values() {
		let args = Args::parse_from(["fulfillment"]);
		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn test_args_custom_values() {
		let args = Args::parse_from(["fulfillment", "--config", "desk.toml", "-l", "debug"]);
		assert_eq!(args.config, PathBuf::from("desk.toml"));
		assert_eq!(args.log_level, "debug");
	}

	#[tokio::test]
	async fn test_engine_from_config_file() {
		let temp_dir = tempdir().unwrap();
		let config_path = temp_dir.path().join("fulfillment.toml");
		std::fs::write(
			&config_path,
			r#"
[engine]
id = "central-desk"
confirmation_window_seconds = 120

[storage]
primary = "memory"
[storage.implementations.memory]

[notifications]
primary = "log"
[notifications.implementations.log]
level = "debug"
"#,
		)
		.unwrap();

		let config = Config::from_file(config_path.to_str().unwrap())
			.await
			.unwrap();
		let engine = factory_registry::build_engine_from_config(config).unwrap();
		assert_eq!(engine.config().engine.id, "central-desk");
		assert_eq!(engine.window().seconds(), 120);

		engine.initialize().await.unwrap();
		engine.shutdown().await.unwrap();
	}
}
