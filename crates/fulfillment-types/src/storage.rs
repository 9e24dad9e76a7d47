//! Storage-related types for the fulfillment system.

use std::str::FromStr;

/// Namespaces for the different record collections.
///
/// This enum provides type safety for storage operations by replacing
/// string literals with strongly typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Order records, keyed by order id
	Orders,
	/// Audit event lists, keyed by order id
	OrderHistory,
	/// Order number to order id mapping
	OrderNumbers,
	/// Lists of known ids (orders, users)
	Indexes,
	/// Product records, keyed by product id
	Products,
	/// User records, keyed by user id
	Users,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Orders => "orders",
			StorageKey::OrderHistory => "order_history",
			StorageKey::OrderNumbers => "order_numbers",
			StorageKey::Indexes => "indexes",
			StorageKey::Products => "products",
			StorageKey::Users => "users",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Orders,
			Self::OrderHistory,
			Self::OrderNumbers,
			Self::Indexes,
			Self::Products,
			Self::Users,
		]
		.into_iter()
	}

	/// Full key of one record in this namespace.
	pub fn key(&self, id: &str) -> String {
		format!("{}:{}", self.as_str(), id)
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all().find(|key| key.as_str() == s).ok_or(())
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}

/// Well-known entries of [`StorageKey::Indexes`].
pub mod index {
	/// Every order id, in creation order.
	pub const ORDERS: &str = "orders";
	/// Every user id, in registration order.
	pub const USERS: &str = "users";
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_storage_keys_parse_back() {
		for key in StorageKey::all() {
			assert_eq!(key.as_str().parse::<StorageKey>(), Ok(key));
		}
		assert_eq!(StorageKey::Orders.key("abc"), "orders:abc");
	}
}
