//! Broadcast bus for engine events.
//!
//! Events are published after their transition committed. Having no
//! subscriber is not an error for the publisher.

use fulfillment_types::FulfillmentEvent;
use tokio::sync::broadcast;

/// Default number of events buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Cloneable handle publishing to every subscriber.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<FulfillmentEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity.max(1));
		Self { sender }
	}

	/// Subscribes to events published from now on.
	pub fn subscribe(&self) -> broadcast::Receiver<FulfillmentEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event, returning the number of subscribers reached.
	pub fn publish(
		&self,
		event: FulfillmentEvent,
	) -> Result<usize, broadcast::error::SendError<FulfillmentEvent>> {
		self.sender.send(event)
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(DEFAULT_CAPACITY)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use fulfillment_types::SweepEvent;

	#[tokio::test]
	async fn test_publish_reaches_subscribers() {
		let bus = EventBus::default();
		let event = FulfillmentEvent::Sweep(SweepEvent::Completed {
			examined: 2,
			confirmed: 1,
		});
		assert!(bus.publish(event.clone()).is_err());

		let mut receiver = bus.subscribe();
		assert_eq!(bus.publish(event).unwrap(), 1);
		match receiver.recv().await.unwrap() {
			FulfillmentEvent::Sweep(SweepEvent::Completed { examined, confirmed }) => {
				assert_eq!((examined, confirmed), (2, 1));
			},
			other => panic!("unexpected event {:?}", other),
		}
	}
}
