//! Listings, status reads and the background sweep loop.

mod common;

use common::*;
use fulfillment_core::LifecycleError;
use fulfillment_types::{
	AuditAction, FulfillmentEvent, OrderEvent, OrderStatus, Principal, Role, SweepEvent,
};
use rust_decimal_macros::dec;
use std::time::Duration;

#[tokio::test]
async fn test_order_detail_sweeps_on_read() {
	let h = harness().await;
	let id = h.create_order().await.order.id;

	h.clock.advance_secs(45);
	let detail = h.engine.order_detail(&id, &deliverer()).await.unwrap();
	assert_eq!(detail.elapsed_seconds, 45);
	assert_eq!(detail.remaining_seconds, 135);

	h.clock.advance_secs(200);
	let detail = h.engine.order_detail(&id, &deliverer()).await.unwrap();
	assert_eq!(detail.order.status, OrderStatus::Confirmed);
	assert!(detail.order.confirmed_at.is_some());
	assert!(!detail.can_cancel);

	let mut inactive = seller();
	inactive.is_active = false;
	let result = h.engine.order_detail(&id, &inactive).await;
	assert!(matches!(result, Err(LifecycleError::Forbidden(_))));

	let result = h.engine.check_order_status("missing", &seller()).await;
	assert!(matches!(result, Err(LifecycleError::NotFound(_))));
	let result = h.engine.get_history("missing").await;
	assert!(matches!(result, Err(LifecycleError::NotFound(_))));
}

#[tokio::test]
async fn test_seller_orders_are_own_and_newest_first() {
	let h = harness().await;
	let first = h.create_order().await.order.id;
	h.clock.advance_secs(5);
	let second = h.create_order().await.order.id;
	h.engine
		.create_order(&other_seller(), order_request(&[("p1", dec!(1))]))
		.await
		.unwrap();

	let ids: Vec<_> = h
		.engine
		.seller_orders(&seller())
		.await
		.unwrap()
		.into_iter()
		.map(|o| o.id)
		.collect();
	assert_eq!(ids, vec![second, first]);
	assert_eq!(h.engine.seller_orders(&other_seller()).await.unwrap().len(), 1);

	let result = h.engine.seller_orders(&handler()).await;
	assert!(matches!(result, Err(LifecycleError::Forbidden(_))));
}

#[tokio::test]
async fn test_stock_handler_queue_and_history() {
	let h = harness().await;
	let prepared = h.confirmed_order().await;
	h.engine
		.start_preparing(&prepared, &handler())
		.await
		.unwrap();
	let delivered = h.order_in_delivery().await;
	let pending = h.create_order().await.order.id;

	// The queue sweeps first, so an expired order shows up as confirmed.
	let waiting = h.create_order().await.order.id;
	h.clock.advance_secs(181);

	let queue: Vec<_> = h
		.engine
		.stock_handler_queue(&other_handler())
		.await
		.unwrap()
		.into_iter()
		.map(|o| (o.id, o.status))
		.collect();
	assert!(queue.contains(&(prepared.clone(), OrderStatus::Preparing)));
	assert!(queue.contains(&(pending.clone(), OrderStatus::Confirmed)));
	assert!(queue.contains(&(waiting.clone(), OrderStatus::Confirmed)));
	assert!(!queue.iter().any(|(id, _)| id == &delivered));

	// h1 sees the orders it handled plus the shared queue.
	let history: Vec<_> = h
		.engine
		.stock_handler_history(&handler())
		.await
		.unwrap()
		.into_iter()
		.map(|o| o.id)
		.collect();
	assert_eq!(history.len(), 4);
	assert!(history.contains(&delivered));

	let other: Vec<_> = h
		.engine
		.stock_handler_history(&other_handler())
		.await
		.unwrap()
		.into_iter()
		.map(|o| o.id)
		.collect();
	assert_eq!(other.len(), 3);
	assert!(!other.contains(&delivered));

	let result = h.engine.stock_handler_queue(&deliverer()).await;
	assert!(matches!(result, Err(LifecycleError::Forbidden(_))));
}

#[tokio::test]
async fn test_deliverer_views() {
	let h = harness().await;
	let active = h.order_in_delivery().await;
	let done = h.order_in_delivery().await;
	h.engine.mark_delivered(&done, &deliverer()).await.unwrap();

	let current: Vec<_> = h
		.engine
		.deliverer_active(&deliverer())
		.await
		.unwrap()
		.into_iter()
		.map(|o| o.id)
		.collect();
	assert_eq!(current, vec![active.clone()]);

	let history = h.engine.deliverer_history(&deliverer()).await.unwrap();
	assert_eq!(history.len(), 2);
	assert!(h
		.engine
		.deliverer_history(&other_deliverer())
		.await
		.unwrap()
		.is_empty());

	let result = h.engine.deliverer_active(&seller()).await;
	assert!(matches!(result, Err(LifecycleError::Forbidden(_))));
}

#[tokio::test]
async fn test_available_deliverers_report_load() {
	let h = harness().await;
	h.order_in_delivery().await;
	h.order_in_delivery().await;

	let mut deliverers = h.engine.available_deliverers(&handler()).await.unwrap();
	deliverers.sort_by(|a, b| a.id.cmp(&b.id));
	let loads: Vec<_> = deliverers
		.iter()
		.map(|d| (d.id.as_str(), d.active_deliveries))
		.collect();
	assert_eq!(loads, vec![("d1", 2), ("d2", 0)]);
	assert_eq!(deliverers[0].full_name, "Driss Kettani");

	let result = h
		.engine
		.available_deliverers(&Principal::new("a1", Role::Admin))
		.await;
	assert!(matches!(result, Err(LifecycleError::Forbidden(_))));
}

#[tokio::test]
async fn test_available_deliverers_fall_back_to_inactive() {
	let h = harness().await;
	for id in ["d1", "d2"] {
		let mut user = h.engine.users().get_user(id).await.unwrap().unwrap();
		user.is_active_account = false;
		h.engine.users().upsert(&user).await.unwrap();
	}

	let mut ids: Vec<_> = h
		.engine
		.available_deliverers(&handler())
		.await
		.unwrap()
		.into_iter()
		.map(|d| d.id)
		.collect();
	ids.sort();
	assert_eq!(ids, vec!["d1", "d2", "d3"]);
}

#[tokio::test]
async fn test_transitions_are_published_on_the_bus() {
	let h = harness().await;
	let mut events = h.engine.event_bus().subscribe();
	let id = h.create_order().await.order.id;
	h.engine
		.cancel_order(&id, &seller(), "duplicate")
		.await
		.unwrap();

	let mut seen = Vec::new();
	while let Ok(FulfillmentEvent::Order(OrderEvent::Transitioned {
		order_id, action, status, ..
	})) = events.try_recv()
	{
		assert_eq!(order_id, id);
		seen.push((action, status));
	}
	assert_eq!(
		seen,
		vec![
			(AuditAction::Created, OrderStatus::Pending),
			(AuditAction::Cancelled, OrderStatus::Cancelled),
		]
	);
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_sweeps_until_shutdown() {
	let h = harness().await;
	let id = h.create_order().await.order.id;
	h.clock.advance_secs(181);
	let mut events = h.engine.event_bus().subscribe();

	h.engine
		.run_until(tokio::time::sleep(Duration::from_millis(2500)))
		.await
		.unwrap();

	let mut confirmed = Vec::new();
	let mut sweeps = 0;
	while let Ok(event) = events.try_recv() {
		match event {
			FulfillmentEvent::Order(OrderEvent::Transitioned {
				order_id, action, ..
			}) => confirmed.push((order_id, action)),
			FulfillmentEvent::Sweep(SweepEvent::Completed { .. }) => sweeps += 1,
		}
	}
	assert_eq!(confirmed, vec![(id, AuditAction::Confirmed)]);
	assert!(sweeps >= 2);

	h.engine.shutdown().await.unwrap();
	assert_eq!(h.sink.sent().await.len(), 2);
}

#[tokio::test]
async fn test_initialize_confirms_expired_orders() {
	let h = harness().await;
	let id = h.create_order().await.order.id;
	h.clock.advance_secs(600);

	h.engine.initialize().await.unwrap();
	let orders = h.engine.seller_orders(&seller()).await.unwrap();
	assert_eq!(orders[0].id, id);
	assert_eq!(orders[0].status, OrderStatus::Confirmed);
}
