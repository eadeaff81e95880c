//! Broadcast-based emitter for [`ClientEvent`]s.

use std::sync::atomic::{AtomicU64, Ordering};

use ccs_core::events::ClientEvent;
use ccs_settings::DEFAULT_EVENT_CAPACITY;
use tokio::sync::broadcast;

/// Fans client events out to every subscriber.
///
/// Non-blocking: `emit` never awaits. Slow receivers lag and lose the
/// oldest events rather than stalling the client.
pub struct EventEmitter {
    tx: broadcast::Sender<ClientEvent>,
    emit_count: AtomicU64,
}

impl EventEmitter {
    /// Create an emitter with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create an emitter with a custom capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            emit_count: AtomicU64::new(0),
        }
    }

    /// Send an event to all current subscribers.
    ///
    /// Returns how many receivers got it; 0 with no subscribers.
    pub fn emit(&self, event: ClientEvent) -> usize {
        let _ = self.emit_count.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(event = event.event_type(), "emit");
        self.tx.send(event).unwrap_or(0)
    }

    /// Receive every event emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Total events emitted.
    pub fn emit_count(&self) -> u64 {
        self.emit_count.load(Ordering::Relaxed)
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}
