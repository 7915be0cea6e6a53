//! Fire-and-forget notification bus.
//!
//! Delivery semantics are explicit: every subscriber present at publish
//! time receives each notification at most once, there is no
//! acknowledgement, and publishing with no subscriber (popup closed) is a
//! normal outcome rather than an error. A subscriber that falls more than
//! `capacity` messages behind loses the oldest ones.

use tokio::sync::broadcast;

/// Default number of undelivered notifications buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct NotificationBus<T> {
    tx: broadcast::Sender<T>,
}

impl<T: Clone + Send + std::fmt::Debug + 'static> NotificationBus<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to every current subscriber. Returns how many received it.
    pub fn publish(&self, notification: T) -> usize {
        match self.tx.send(notification) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(dropped)) => {
                tracing::trace!(notification = ?dropped, "no listener for notification");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Clone + Send + std::fmt::Debug + 'static> Default for NotificationBus<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
