//! Time sources for the lifecycle.
//!
//! Every window computation reads the time through [`TimeSource`], so tests
//! drive expiry with a [`ManualClock`] instead of sleeping.

use chrono::{DateTime, Duration, Utc};
use std::sync::RwLock;

/// Supplies the current time.
pub trait TimeSource: Send + Sync {
	fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl TimeSource for SystemClock {
	fn now(&self) -> DateTime<Utc> {
		Utc::now()
	}
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
	now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
	pub fn new(start: DateTime<Utc>) -> Self {
		Self {
			now: RwLock::new(start),
		}
	}

	/// Moves the clock forward.
	pub fn advance(&self, by: Duration) {
		let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
		*now += by;
	}

	pub fn advance_secs(&self, seconds: i64) {
		self.advance(Duration::seconds(seconds));
	}

	pub fn set(&self, to: DateTime<Utc>) {
		*self.now.write().unwrap_or_else(|e| e.into_inner()) = to;
	}
}

impl Default for ManualClock {
	fn default() -> Self {
		Self::new(Utc::now())
	}
}

impl TimeSource for ManualClock {
	fn now(&self) -> DateTime<Utc> {
		*self.now.read().unwrap_or_else(|e| e.into_inner())
	}
}
