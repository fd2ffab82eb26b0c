//! Registry of connected observers and per-tick fan-out.
//!
//! Every observer is an [`ObserverId`] plus the sending half of a bounded
//! [`mpsc`] channel. The connection task that owns the receiving half does
//! the actual network I/O, so [`BroadcastHub::broadcast`] never waits on a
//! socket: it makes one non-blocking `try_send` pass over the registry
//! while holding the registry lock.
//!
//! Holding the lock for the whole pass means an observer that has been
//! unregistered is never delivered to afterwards, and a join or leave that
//! races a broadcast simply lands before or after it.
//!
//! Per-observer outcomes:
//!
//! - **Delivered** -- the frame was queued.
//! - **Skipped** -- the observer's queue is full; it misses this frame but
//!   stays registered. Frames it does receive remain in tick order.
//! - **Dropped** -- the receiver is gone; the observer is removed.

use std::collections::BTreeMap;
use std::sync::Arc;

use guardian_types::{ObserverId, TelemetrySnapshot};
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, trace, warn};

/// A serialized snapshot, shared by every observer that receives it.
pub type Frame = Arc<str>;

/// Default number of frames buffered per observer.
pub const DEFAULT_OBSERVER_CAPACITY: usize = 16;

/// The hub's handle to one connected observer.
#[derive(Debug)]
pub struct Observer {
    id: ObserverId,
    tx: mpsc::Sender<Frame>,
}

impl Observer {
    /// Create an observer handle and the receiver its connection task
    /// should drain. A zero capacity is raised to one.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                id: ObserverId::new(),
                tx,
            },
            rx,
        )
    }

    /// This observer's identity token.
    pub const fn id(&self) -> ObserverId {
        self.id
    }
}

/// Outcome counts of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Observers the frame was queued for.
    pub delivered: usize,
    /// Observers whose queue was full.
    pub skipped: usize,
    /// Observers removed because their receiver was closed.
    pub dropped: usize,
}

/// Concurrent-safe registry of connected observers.
#[derive(Debug, Default)]
pub struct BroadcastHub {
    observers: Mutex<BTreeMap<ObserverId, mpsc::Sender<Frame>>>,
}

impl BroadcastHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer to the active set.
    pub async fn register(&self, observer: Observer) {
        let mut observers = self.observers.lock().await;
        observers.insert(observer.id, observer.tx);
        debug!(observer = %observer.id, total = observers.len(), "Observer registered");
    }

    /// Remove an observer. Returns `false` if it was already gone.
    pub async fn unregister(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.lock().await;
        let removed = observers.remove(&id).is_some();
        if removed {
            debug!(observer = %id, total = observers.len(), "Observer unregistered");
        }
        removed
    }

    /// Remove every observer, closing their channels. Returns how many
    /// were removed.
    pub async fn disconnect_all(&self) -> usize {
        let mut observers = self.observers.lock().await;
        let count = observers.len();
        observers.clear();
        debug!(count, "All observers disconnected");
        count
    }

    /// Number of currently registered observers.
    pub async fn observer_count(&self) -> usize {
        self.observers.lock().await.len()
    }

    /// Serialize `snapshot` once and deliver it to every observer.
    ///
    /// Never fails. A snapshot that cannot be serialized is logged and
    /// delivered to nobody.
    pub async fn broadcast(&self, snapshot: &TelemetrySnapshot) -> BroadcastReport {
        match serde_json::to_string(snapshot) {
            Ok(json) => self.broadcast_frame(Frame::from(json)).await,
            Err(e) => {
                warn!(tick = snapshot.tick, "Failed to serialize telemetry snapshot: {e}");
                BroadcastReport::default()
            }
        }
    }

    /// Deliver an already serialized frame to every observer.
    pub async fn broadcast_frame(&self, frame: Frame) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut observers = self.observers.lock().await;

        observers.retain(|id, tx| match tx.try_send(Arc::clone(&frame)) {
            Ok(()) => {
                report.delivered = report.delivered.saturating_add(1);
                true
            }
            Err(TrySendError::Full(_)) => {
                trace!(observer = %id, "Observer queue full, skipping frame");
                report.skipped = report.skipped.saturating_add(1);
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!(observer = %id, "Observer channel closed, dropping");
                report.dropped = report.dropped.saturating_add(1);
                false
            }
        });

        report
    }
}
