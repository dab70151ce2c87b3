//! Broadcast-based event emitter for `StrandEvent` frames.

use std::sync::atomic::{AtomicU64, Ordering};

use strand_core::events::StrandEvent;
use tokio::sync::broadcast;

/// Default broadcast channel capacity.
const DEFAULT_CAPACITY: usize = 1024;

/// Broadcast-based event emitter.
///
/// Non-blocking: `emit` never awaits. Slow receivers lag out (dropped
/// frames on their end) rather than stalling the session runner or tool
/// dispatch.
pub struct EventEmitter {
    tx: broadcast::Sender<StrandEvent>,
    emit_count: AtomicU64,
}

impl EventEmitter {
    /// Create a new emitter with the default channel capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new emitter with a custom channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            emit_count: AtomicU64::new(0),
        }
    }

    /// Emit a frame to all subscribers. Non-blocking.
    ///
    /// Returns the number of receivers that saw the frame (0 when nobody
    /// is subscribed, which is not an error).
    pub fn emit(&self, event: StrandEvent) -> usize {
        let _ = self.emit_count.fetch_add(1, Ordering::Relaxed);
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to frames emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<StrandEvent> {
        self.tx.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Total frames emitted since construction.
    pub fn emit_count(&self) -> u64 {
        self.emit_count.load(Ordering::Relaxed)
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}
