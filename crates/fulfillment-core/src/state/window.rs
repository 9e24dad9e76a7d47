//! Confirmation window computations.
//!
//! A pending order may be modified or cancelled by its seller while the
//! window is open, and is confirmed by the sweeper once it has elapsed.

use chrono::{DateTime, Utc};
use fulfillment_types::{Order, OrderSnapshot, OrderStatus, OrderStatusReport};
use std::time::Duration;

/// Window-derived view of one order at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
	pub elapsed_seconds: i64,
	pub remaining_seconds: i64,
	pub can_modify: bool,
	pub can_cancel: bool,
	pub should_confirm: bool,
}

/// The grace period between creation and automatic confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationWindow {
	seconds: i64,
}

impl ConfirmationWindow {
	pub fn new(length: Duration) -> Self {
		Self {
			seconds: i64::try_from(length.as_secs()).unwrap_or(i64::MAX),
		}
	}

	pub fn seconds(&self) -> i64 {
		self.seconds
	}

	/// Whole seconds since creation while pending; the full window otherwise.
	pub fn elapsed(&self, order: &Order, now: DateTime<Utc>) -> i64 {
		if order.status != OrderStatus::Pending {
			return self.seconds;
		}
		(now - order.created_at).num_seconds().max(0)
	}

	pub fn remaining(&self, order: &Order, now: DateTime<Utc>) -> i64 {
		(self.seconds - self.elapsed(order, now)).max(0)
	}

	pub fn can_modify(&self, order: &Order, now: DateTime<Utc>) -> bool {
		order.status == OrderStatus::Pending && self.remaining(order, now) > 0
	}

	pub fn can_cancel(&self, order: &Order, now: DateTime<Utc>) -> bool {
		self.can_modify(order, now)
	}

	pub fn should_confirm(&self, order: &Order, now: DateTime<Utc>) -> bool {
		order.status == OrderStatus::Pending && self.elapsed(order, now) >= self.seconds
	}

	pub fn state(&self, order: &Order, now: DateTime<Utc>) -> WindowState {
		let elapsed_seconds = self.elapsed(order, now);
		let remaining_seconds = (self.seconds - elapsed_seconds).max(0);
		let open = order.status == OrderStatus::Pending && remaining_seconds > 0;
		WindowState {
			elapsed_seconds,
			remaining_seconds,
			can_modify: open,
			can_cancel: open,
			should_confirm: order.status == OrderStatus::Pending
				&& elapsed_seconds >= self.seconds,
		}
	}

	pub fn snapshot(&self, order: Order, now: DateTime<Utc>) -> OrderSnapshot {
		let state = self.state(&order, now);
		OrderSnapshot {
			order,
			elapsed_seconds: state.elapsed_seconds,
			remaining_seconds: state.remaining_seconds,
			can_modify: state.can_modify,
			can_cancel: state.can_cancel,
		}
	}

	pub fn report(&self, order: &Order, now: DateTime<Utc>) -> OrderStatusReport {
		let state = self.state(order, now);
		OrderStatusReport {
			order_id: order.id.clone(),
			order_number: order.order_number.clone(),
			status: order.status,
			elapsed_seconds: state.elapsed_seconds,
			remaining_seconds: state.remaining_seconds,
			can_modify: state.can_modify,
			can_cancel: state.can_cancel,
			confirmed: order.confirmed_at.is_some(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal::Decimal;

	fn order(created_at: DateTime<Utc>, status: OrderStatus) -> Order {
		Order {
			id: "o1".into(),
			order_number: "CMD-1".into(),
			seller_id: "s1".into(),
			seller_name: "Seller".into(),
			customer_name: "Customer".into(),
			status,
			items: vec![],
			total_amount: Decimal::ZERO,
			is_paid: false,
			created_at,
			updated_at: created_at,
			confirmed_at: None,
			prepared_at: None,
			ready_at: None,
			delivered_at: None,
			cancelled_at: None,
			stock_handler_id: None,
			deliverer_id: None,
			deliverer_name: None,
			cancellation_reason: None,
			cancelled_by: None,
		}
	}

	#[test]
	fn test_remaining_counts_down_to_zero() {
		let window = ConfirmationWindow::new(Duration::from_secs(180));
		let created = Utc::now();
		let pending = order(created, OrderStatus::Pending);

		let at = |secs| created + chrono::Duration::seconds(secs);
		assert_eq!(window.remaining(&pending, at(0)), 180);
		assert_eq!(window.remaining(&pending, at(60)), 120);
		assert!(window.can_modify(&pending, at(179)));
		assert!(!window.should_confirm(&pending, at(179)));

		assert_eq!(window.remaining(&pending, at(180)), 0);
		assert!(!window.can_modify(&pending, at(180)));
		assert!(!window.can_cancel(&pending, at(180)));
		assert!(window.should_confirm(&pending, at(180)));
		assert_eq!(window.remaining(&pending, at(500)), 0);
	}

	#[test]
	fn test_clock_skew_clamps_elapsed() {
		let window = ConfirmationWindow::new(Duration::from_secs(180));
		let created = Utc::now();
		let pending = order(created, OrderStatus::Pending);
		let before = created - chrono::Duration::seconds(30);
		assert_eq!(window.elapsed(&pending, before), 0);
		assert_eq!(window.remaining(&pending, before), 180);
	}

	#[test]
	fn test_non_pending_reports_full_window() {
		let window = ConfirmationWindow::new(Duration::from_secs(180));
		let created = Utc::now();
		let confirmed = order(created, OrderStatus::Confirmed);

		let state = window.state(&confirmed, created);
		assert_eq!(state.elapsed_seconds, 180);
		assert_eq!(state.remaining_seconds, 0);
		assert!(!state.can_modify);
		assert!(!state.should_confirm);
	}
}
