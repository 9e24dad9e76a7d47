//! Multi-file configuration loading.
//!
//! A configuration file may pull in other files with a top-level `include`
//! key holding a path or a list of paths, relative to the directory of the
//! entry file. Included files are merged into the entry file section by
//! section. A top-level section may be defined in one file only, and no file
//! may be loaded twice.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

const INCLUDE_KEY: &str = "include";

/// Loads an entry file and the files it includes.
pub struct ConfigLoader {
	base_path: PathBuf,
	seen: HashSet<PathBuf>,
	/// File each top-level section was defined in.
	owners: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	/// Creates a loader resolving relative paths against `base_path`.
	pub fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
			seen: HashSet::new(),
			owners: HashMap::new(),
		}
	}

	/// Loads, merges, parses and validates a configuration.
	pub async fn load_config(&mut self, entry: impl AsRef<Path>) -> Result<Config, ConfigError> {
		let entry = self.locate(entry.as_ref())?;
		let text = self.read(&entry).await?;
		let mut root: toml::Table = toml::from_str(&text)?;

		let includes = match root.remove(INCLUDE_KEY) {
			Some(value) => include_paths(value)?,
			None => return text.parse(),
		};
		self.claim_sections(&root, &entry)?;

		for include in includes {
			let path = self.locate(&include)?;
			let table: toml::Table = toml::from_str(&self.read(&path).await?)?;
			self.claim_sections(&table, &path)?;
			root.extend(table);
		}

		toml::to_string(&root)
			.map_err(|e| ConfigError::Parse(format!("Failed to serialize merged config: {}", e)))?
			.parse()
	}

	/// Reads a file once, with environment variables resolved.
	async fn read(&mut self, path: &Path) -> Result<String, ConfigError> {
		let canonical = tokio::fs::canonicalize(path)
			.await
			.map_err(|e| not_found(format!("Cannot resolve path {}: {}", path.display(), e)))?;
		if !self.seen.insert(canonical.clone()) {
			return Err(ConfigError::Validation(format!(
				"Circular include detected: {} was already loaded",
				canonical.display()
			)));
		}
		let text = tokio::fs::read_to_string(path).await?;
		resolve_env_vars(&text)
	}

	fn claim_sections(&mut self, table: &toml::Table, path: &Path) -> Result<(), ConfigError> {
		for section in table.keys() {
			if let Some(owner) = self.owners.get(section) {
				return Err(ConfigError::Validation(format!(
					"Duplicate section '{}' found in {} and {}",
					section,
					owner.display(),
					path.display()
				)));
			}
			self.owners.insert(section.clone(), path.to_path_buf());
		}
		Ok(())
	}

	fn locate(&self, path: &Path) -> Result<PathBuf, ConfigError> {
		let resolved = if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.base_path.join(path)
		};
		if resolved.exists() {
			Ok(resolved)
		} else {
			Err(not_found(format!(
				"Configuration file not found: {}",
				resolved.display()
			)))
		}
	}
}

fn include_paths(value: toml::Value) -> Result<Vec<PathBuf>, ConfigError> {
	match value {
		toml::Value::String(path) => Ok(vec![PathBuf::from(path)]),
		toml::Value::Array(items) => items
			.into_iter()
			.map(|item| match item {
				toml::Value::String(path) => Ok(PathBuf::from(path)),
				_ => Err(ConfigError::Validation(
					"Include array must contain only strings".into(),
				)),
			})
			.collect(),
		_ => Err(ConfigError::Validation(
			"Include must be a string or array of strings".into(),
		)),
	}
}

fn not_found(message: String) -> ConfigError {
	ConfigError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, message))
}
