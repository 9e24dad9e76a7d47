//! Users, roles and the capabilities each role grants.
//!
//! The identity provider hands the engine a [`Principal`] for every call.
//! Role dispatch is a single lookup: a transition names the [`Capability`]
//! it needs and [`Role::grants`] answers whether the caller holds it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role held by a user of the fulfillment system.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	Admin,
	/// Creates orders for customers.
	Seller,
	/// Prepares confirmed orders and hands them to deliverers.
	StockHandler,
	/// Transports orders to customers.
	Deliverer,
}

/// An action class gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
	/// Create a new order.
	CreateOrder,
	/// Modify or cancel one's own pending order.
	ManagePendingOrder,
	/// Start preparing or mark an order ready.
	PrepareOrder,
	/// Hand an order to a deliverer.
	AssignDeliverer,
	/// List deliverers available for assignment.
	ViewDeliverers,
	/// Complete or abort an assigned delivery.
	CompleteDelivery,
}

impl Role {
	/// Returns the string representation used in storage and audit snapshots.
	pub fn as_str(&self) -> &'static str {
		match self {
			Role::Admin => "admin",
			Role::Seller => "seller",
			Role::StockHandler => "stock_handler",
			Role::Deliverer => "deliverer",
		}
	}

	/// Whether this role grants the given capability.
	pub fn grants(&self, capability: Capability) -> bool {
		matches!(
			(self, capability),
			(Role::Seller, Capability::CreateOrder)
				| (Role::Seller, Capability::ManagePendingOrder)
				| (Role::StockHandler, Capability::PrepareOrder)
				| (Role::StockHandler, Capability::AssignDeliverer)
				| (Role::StockHandler, Capability::ViewDeliverers)
				| (Role::Deliverer, Capability::CompleteDelivery)
		)
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Role {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"admin" => Ok(Self::Admin),
			"seller" => Ok(Self::Seller),
			"stock_handler" => Ok(Self::StockHandler),
			"deliverer" => Ok(Self::Deliverer),
			other => Err(format!("Unknown role: {}", other)),
		}
	}
}

/// The acting user of an engine call, as vouched for by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
	pub user_id: String,
	pub role: Role,
	pub is_active: bool,
}

impl Principal {
	/// Creates an active principal.
	pub fn new(user_id: impl Into<String>, role: Role) -> Self {
		Self {
			user_id: user_id.into(),
			role,
			is_active: true,
		}
	}

	/// An active principal may act only with capabilities its role grants.
	pub fn can(&self, capability: Capability) -> bool {
		self.is_active && self.role.grants(capability)
	}
}

impl From<&UserRecord> for Principal {
	fn from(user: &UserRecord) -> Self {
		Self {
			user_id: user.id.clone(),
			role: user.role,
			is_active: user.is_active_account,
		}
	}
}

/// A user account as stored by the account management collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
	pub id: String,
	pub username: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub full_name: Option<String>,
	pub role: Role,
	#[serde(default = "default_active")]
	pub is_active_account: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub latitude: Option<Decimal>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub longitude: Option<Decimal>,
}

fn default_active() -> bool {
	true
}

impl UserRecord {
	/// Creates an active user without a location.
	pub fn new(id: impl Into<String>, username: impl Into<String>, role: Role) -> Self {
		Self {
			id: id.into(),
			username: username.into(),
			full_name: None,
			role,
			is_active_account: true,
			latitude: None,
			longitude: None,
		}
	}

	/// Full name when set, username otherwise.
	pub fn display_name(&self) -> String {
		match self.full_name.as_deref() {
			Some(name) if !name.trim().is_empty() => name.to_string(),
			_ => self.username.clone(),
		}
	}
}
