//! Registry trait for named implementations.
//!
//! Pluggable backends (storage, notification sinks) expose a `Registry`
//! struct declaring the name they are configured under and the factory that
//! builds them from their TOML table.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// Name used in configuration files, e.g. `"memory"` for
	/// `[storage.implementations.memory]`.
	const NAME: &'static str;

	/// Factory function type of the implementation family.
	type Factory;

	/// Returns the factory building this implementation from its config table.
	fn factory() -> Self::Factory;
}
