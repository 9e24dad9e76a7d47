//! Fulfillment engine that exposes the order lifecycle to callers.
//!
//! This module contains the main FulfillmentEngine struct which runs every
//! transition through the lifecycle, publishes committed transitions on the
//! event bus, hands notifications to the notification service and drives
//! the periodic confirmation sweep.

pub mod event_bus;
pub mod lifecycle;
pub mod publisher;
mod queries;

use crate::catalog::{ProductCatalog, UserDirectory};
use crate::lifecycle::{LifecycleError, OrderLifecycle, TransitionOutcome};
use crate::monitoring::{ConfirmationSweeper, SweepSummary};
use crate::state::{ConfirmationWindow, OrderStore};
use event_bus::EventBus;
use fulfillment_config::Config;
use fulfillment_notify::NotificationService;
use fulfillment_storage::StorageService;
use fulfillment_types::{CreateOrder, ModifyOrder, OrderSnapshot, Principal};
use publisher::TransitionPublisher;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while the engine is running.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Service error: {0}")]
	Service(String),
}

/// Main engine coordinating lifecycle, sweeper, events and notifications.
#[derive(Clone)]
pub struct FulfillmentEngine {
	/// Engine configuration.
	pub(crate) config: Config,
	/// Storage service shared by every component.
	pub(crate) storage: Arc<StorageService>,
	/// The transition state machine.
	pub(crate) lifecycle: Arc<OrderLifecycle>,
	/// Promotes expired pending orders.
	pub(crate) sweeper: Arc<ConfirmationSweeper>,
	/// Post-commit event and notification hand-off.
	pub(crate) publisher: TransitionPublisher,
	/// Event bus for observers of committed transitions.
	pub(crate) event_bus: EventBus,
	/// Notification hand-off, flushed on shutdown.
	pub(crate) notifications: Arc<NotificationService>,
	pub(crate) orders: OrderStore,
	pub(crate) products: ProductCatalog,
	pub(crate) users: UserDirectory,
}

impl FulfillmentEngine {
	/// Creates a new engine over the given services.
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		notifications: Arc<NotificationService>,
		lifecycle: Arc<OrderLifecycle>,
		event_bus: EventBus,
	) -> Self {
		let publisher = TransitionPublisher::new(event_bus.clone(), notifications.clone());
		let orders = OrderStore::new(storage.clone());
		let sweeper = Arc::new(ConfirmationSweeper::new(
			lifecycle.clone(),
			orders.clone(),
			publisher.clone(),
		));

		Self {
			config,
			products: ProductCatalog::new(storage.clone()),
			users: UserDirectory::new(storage.clone()),
			storage,
			lifecycle,
			sweeper,
			publisher,
			event_bus,
			notifications,
			orders,
		}
	}

	/// Main execution loop: sweeps pending orders until Ctrl+C.
	pub async fn run(&self) -> Result<(), EngineError> {
		self.run_until(async {
			if let Err(e) = tokio::signal::ctrl_c().await {
				tracing::error!("Failed to listen for shutdown signal: {}", e);
			}
		})
		.await
	}

	/// Sweeps pending orders on the configured interval until `shutdown`
	/// resolves.
	pub async fn run_until<F>(&self, shutdown: F) -> Result<(), EngineError>
	where
		F: Future<Output = ()>,
	{
		let mut interval = tokio::time::interval(self.config.engine.sweep_interval());
		interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
		tokio::pin!(shutdown);

		loop {
			tokio::select! {
				_ = interval.tick() => {
					if let Err(e) = self.sweeper.sweep_pending().await {
						tracing::warn!("Sweep failed: {}", e);
					}
				}

				_ = &mut shutdown => {
					break;
				}
			}
		}

		Ok(())
	}

	fn finish(&self, outcome: TransitionOutcome) -> OrderSnapshot {
		let order = self.publisher.publish(outcome);
		self.window().snapshot(order, self.lifecycle.now())
	}

	pub async fn create_order(
		&self,
		principal: &Principal,
		request: CreateOrder,
	) -> Result<OrderSnapshot, LifecycleError> {
		let outcome = self.lifecycle.create(principal, request).await?;
		Ok(self.finish(outcome))
	}

	pub async fn modify_order(
		&self,
		order_id: &str,
		principal: &Principal,
		request: ModifyOrder,
	) -> Result<OrderSnapshot, LifecycleError> {
		let outcome = self.lifecycle.modify(order_id, principal, request).await?;
		Ok(self.finish(outcome))
	}

	pub async fn cancel_order(
		&self,
		order_id: &str,
		principal: &Principal,
		reason: &str,
	) -> Result<OrderSnapshot, LifecycleError> {
		let outcome = self.lifecycle.cancel(order_id, principal, reason).await?;
		Ok(self.finish(outcome))
	}

	pub async fn start_preparing(
		&self,
		order_id: &str,
		principal: &Principal,
	) -> Result<OrderSnapshot, LifecycleError> {
		let outcome = self.lifecycle.start_preparing(order_id, principal).await?;
		Ok(self.finish(outcome))
	}

	pub async fn mark_ready(
		&self,
		order_id: &str,
		principal: &Principal,
	) -> Result<OrderSnapshot, LifecycleError> {
		let outcome = self.lifecycle.mark_ready(order_id, principal).await?;
		Ok(self.finish(outcome))
	}

	pub async fn assign_deliverer(
		&self,
		order_id: &str,
		principal: &Principal,
		deliverer_id: &str,
	) -> Result<OrderSnapshot, LifecycleError> {
		let outcome = self
			.lifecycle
			.assign_deliverer(order_id, principal, deliverer_id)
			.await?;
		Ok(self.finish(outcome))
	}

	pub async fn mark_delivered(
		&self,
		order_id: &str,
		principal: &Principal,
	) -> Result<OrderSnapshot, LifecycleError> {
		let outcome = self.lifecycle.mark_delivered(order_id, principal).await?;
		Ok(self.finish(outcome))
	}

	pub async fn cancel_delivery(
		&self,
		order_id: &str,
		principal: &Principal,
		reason: &str,
	) -> Result<OrderSnapshot, LifecycleError> {
		let outcome = self
			.lifecycle
			.cancel_delivery(order_id, principal, reason)
			.await?;
		Ok(self.finish(outcome))
	}

	/// Confirms one order if its window has elapsed; `None` if nothing changed.
	pub async fn sweep_order(&self, order_id: &str) -> Result<Option<OrderSnapshot>, LifecycleError> {
		let confirmed = self.sweeper.sweep_order(order_id).await?;
		Ok(confirmed.map(|order| self.window().snapshot(order, self.lifecycle.now())))
	}

	/// Confirms every pending order whose window has elapsed.
	pub async fn sweep_pending(&self) -> Result<SweepSummary, LifecycleError> {
		self.sweeper.sweep_pending().await
	}

	pub fn window(&self) -> ConfirmationWindow {
		self.lifecycle.window()
	}

	/// Returns a reference to the event bus.
	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// Returns a reference to the configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Returns a reference to the storage service.
	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	/// Product records shared with the catalog collaborator.
	pub fn products(&self) -> &ProductCatalog {
		&self.products
	}

	/// User records shared with the account collaborator.
	pub fn users(&self) -> &UserDirectory {
		&self.users
	}

	/// Notification hand-off used by the engine.
	pub fn notifications(&self) -> &Arc<NotificationService> {
		&self.notifications
	}
}
