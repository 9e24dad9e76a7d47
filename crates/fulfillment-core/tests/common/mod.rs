//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use fulfillment_config::{builders::config::ConfigBuilder, Config};
use fulfillment_core::{EngineBuilder, EngineFactories, FulfillmentEngine, ManualClock};
use fulfillment_notify::{implementations::memory::MemoryNotifier, NotificationInterface};
use fulfillment_storage::implementations::memory::MemoryStorage;
use fulfillment_types::{
	CreateOrder, ItemRequest, NotificationRequest, OrderSnapshot, Principal, ProductRecord,
	Role, UserRecord,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

pub struct Harness {
	pub engine: FulfillmentEngine,
	pub clock: Arc<ManualClock>,
	pub sink: MemoryNotifier,
}

pub fn seller() -> Principal {
	Principal::new("s1", Role::Seller)
}

pub fn other_seller() -> Principal {
	Principal::new("s2", Role::Seller)
}

pub fn handler() -> Principal {
	Principal::new("h1", Role::StockHandler)
}

pub fn other_handler() -> Principal {
	Principal::new("h2", Role::StockHandler)
}

pub fn deliverer() -> Principal {
	Principal::new("d1", Role::Deliverer)
}

pub fn other_deliverer() -> Principal {
	Principal::new("d2", Role::Deliverer)
}

fn user(id: &str, username: &str, full_name: &str, role: Role, active: bool) -> UserRecord {
	let mut user = UserRecord::new(id, username, role);
	user.full_name = Some(full_name.to_string());
	user.is_active_account = active;
	user
}

fn product(id: &str, name: &str, price: Decimal, stock: Option<Decimal>) -> ProductRecord {
	ProductRecord {
		id: id.to_string(),
		name: name.to_string(),
		unit: "kg".to_string(),
		price,
		stock,
		is_validated: true,
		is_active: true,
	}
}

/// An engine over in-memory backends with a manual clock.
///
/// Seeds two sellers, two active and one inactive stock handler, two active
/// and one inactive deliverer, an admin, and the products p1 (10.00, 100 in
/// stock), p2 (7.50, 20 in stock), p3 (3.00, untracked) and p4 (not validated).
pub async fn harness() -> Harness {
	let sink = MemoryNotifier::new();
	let (engine, clock) = seeded_engine(ConfigBuilder::new().build(), Box::new(sink.clone())).await;
	Harness {
		engine,
		clock,
		sink,
	}
}

/// The seeded engine behind [`harness`], with any config and sink.
pub async fn seeded_engine(
	config: Config,
	sink: Box<dyn NotificationInterface>,
) -> (FulfillmentEngine, Arc<ManualClock>) {
	let clock = Arc::new(ManualClock::new(
		Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap(),
	));
	let engine = EngineBuilder::new(config)
		.with_clock(clock.clone())
		.with_storage_backend(Box::new(MemoryStorage::new()))
		.with_notification_sink(sink)
		.build(EngineFactories::default())
		.unwrap();

	for record in [
		user("s1", "sara", "Sara Benali", Role::Seller, true),
		user("s2", "youssef", "Youssef Amrani", Role::Seller, true),
		user("h1", "hana", "Hana Idrissi", Role::StockHandler, true),
		user("h2", "hamid", "Hamid Tazi", Role::StockHandler, true),
		user("h3", "hind", "Hind Alaoui", Role::StockHandler, false),
		user("d1", "driss", "Driss Kettani", Role::Deliverer, true),
		user("d2", "dounia", "Dounia Fassi", Role::Deliverer, true),
		user("d3", "darius", "Darius Nour", Role::Deliverer, false),
		user("a1", "admin", "Admin", Role::Admin, true),
	] {
		engine.users().upsert(&record).await.unwrap();
	}

	let mut draft = product("p4", "Menthe", dec!(2.00), Some(dec!(50)));
	draft.is_validated = false;
	for record in [
		product("p1", "Tomates", dec!(10.00), Some(dec!(100))),
		product("p2", "Oignons", dec!(7.50), Some(dec!(20))),
		product("p3", "Pain", dec!(3.00), None),
		draft,
	] {
		engine.products().upsert(&record).await.unwrap();
	}

	(engine, clock)
}

pub fn order_request(items: &[(&str, Decimal)]) -> CreateOrder {
	CreateOrder {
		customer_name: "Restaurant Atlas".to_string(),
		items: items
			.iter()
			.map(|(id, quantity)| ItemRequest::new(*id, *quantity))
			.collect(),
	}
}

impl Harness {
	pub async fn stock(&self, product_id: &str) -> Option<Decimal> {
		self.engine
			.products()
			.get_product(product_id)
			.await
			.unwrap()
			.unwrap()
			.stock
	}

	/// The default order: 2 x p1 and 2 x p2, total 35.00.
	pub async fn create_order(&self) -> OrderSnapshot {
		self.engine
			.create_order(&seller(), order_request(&[("p1", dec!(2)), ("p2", dec!(2))]))
			.await
			.unwrap()
	}

	/// Creates an order and lets its window elapse.
	pub async fn confirmed_order(&self) -> String {
		let id = self.create_order().await.order.id;
		self.clock.advance_secs(181);
		self.engine.sweep_order(&id).await.unwrap().unwrap();
		id
	}

	/// Drives an order to `in_delivery` with d1, prepared by h1.
	pub async fn order_in_delivery(&self) -> String {
		let id = self.confirmed_order().await;
		self.engine.start_preparing(&id, &handler()).await.unwrap();
		self.engine.mark_ready(&id, &handler()).await.unwrap();
		self.engine
			.assign_deliverer(&id, &handler(), "d1")
			.await
			.unwrap();
		id
	}

	/// Notifications delivered so far.
	pub async fn sent(&self) -> Vec<NotificationRequest> {
		self.engine.notifications().flush().await;
		self.sink.sent().await
	}
}
