//! Event bus using tokio broadcast channel
//!
//! Provides non-blocking event emission with multiple subscribers.
//! Slow subscribers will miss events rather than blocking senders.

use tokio::sync::broadcast;

use super::CompletionEvent;

/// Default channel capacity
const DEFAULT_CAPACITY: usize = 1024;

/// Event bus for completion events
///
/// Uses tokio broadcast channel internally. Events are fire-and-forget;
/// if no subscribers are listening, events are simply dropped.
pub struct EventBus {
    sender: broadcast::Sender<CompletionEvent>,
}

impl EventBus {
    /// Create a new event bus with default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new event bus with custom capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events
    ///
    /// Returns a receiver that will get all events emitted after subscription.
    /// If the receiver falls behind, it will miss events (lagged).
    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber {
            receiver: self.sender.subscribe(),
        }
    }

    /// Emit an event to all subscribers
    ///
    /// This is non-blocking and will not fail. If there are no subscribers,
    /// the event is simply dropped.
    pub fn emit(&self, event: CompletionEvent) {
        let _ = self.sender.send(event);
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

/// Subscriber to event bus
pub struct EventSubscriber {
    receiver: broadcast::Receiver<CompletionEvent>,
}

impl EventSubscriber {
    /// Receive the next event
    ///
    /// Returns None if the bus was dropped.
    /// May return a Lagged error if this subscriber fell behind.
    pub async fn recv(&mut self) -> Option<CompletionEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Event subscriber lagged by {} events", n);
                    continue;
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Option<CompletionEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(_) => None,
        }
    }
}
