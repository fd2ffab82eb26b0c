//! Operator control state for the tick loop's lifecycle.
//!
//! Mode changes to the machine itself (fault, derate, reset, pause) live on
//! [`Machine`](crate::machine::Machine). This module holds what belongs to
//! the loop rather than the machine: the stop request, the runtime-adjustable
//! tick interval, and run statistics.
//!
//! All fields are atomics or a [`Notify`] so the loop and the Axum handlers
//! share them without locks.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

/// Smallest tick interval the operator may set, in milliseconds.
pub const MIN_TICK_INTERVAL_MS: u64 = 100;

/// Shared loop control state.
#[derive(Debug)]
pub struct OperatorState {
    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Wakes the loop out of its sleep when a stop is requested.
    stop_notify: Notify,

    /// Current tick interval in milliseconds.
    tick_interval_ms: AtomicU64,

    /// Number of ticks the loop has executed (paused cycles excluded).
    ticks_executed: AtomicU64,

    /// Wall-clock time the operator state was created.
    started_at: DateTime<Utc>,
}

impl OperatorState {
    /// Create operator state with the given initial tick interval.
    ///
    /// Intervals below [`MIN_TICK_INTERVAL_MS`] are raised to it.
    pub fn new(tick_interval_ms: u64) -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
            stop_notify: Notify::new(),
            tick_interval_ms: AtomicU64::new(tick_interval_ms.max(MIN_TICK_INTERVAL_MS)),
            ticks_executed: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean stop of the tick loop.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        // notify_one stores a permit, so a loop that is mid-tick still
        // wakes on its next wait.
        self.stop_notify.notify_one();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Wait until a stop has been requested.
    pub async fn stopped(&self) {
        while !self.is_stop_requested() {
            self.stop_notify.notified().await;
        }
    }

    // -----------------------------------------------------------------------
    // Tick speed
    // -----------------------------------------------------------------------

    /// Get the current tick interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms.load(Ordering::Acquire)
    }

    /// Set the tick interval in milliseconds.
    ///
    /// Returns the previous interval, or `None` if `ms` is below
    /// [`MIN_TICK_INTERVAL_MS`].
    pub fn set_tick_interval_ms(&self, ms: u64) -> Option<u64> {
        if ms < MIN_TICK_INTERVAL_MS {
            return None;
        }
        Some(self.tick_interval_ms.swap(ms, Ordering::AcqRel))
    }

    // -----------------------------------------------------------------------
    // Statistics
    // -----------------------------------------------------------------------

    /// Record one executed tick.
    pub fn record_tick(&self) {
        self.ticks_executed.fetch_add(1, Ordering::AcqRel);
    }

    /// Number of ticks executed so far.
    pub fn ticks_executed(&self) -> u64 {
        self.ticks_executed.load(Ordering::Acquire)
    }

    /// Wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Seconds since start.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        // `num_seconds` can be negative if the wall clock steps back.
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }
}

/// JSON-serializable loop status for the operator API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationStatus {
    /// Index of the last executed tick.
    pub tick: u64,
    /// Whether the machine is paused.
    pub paused: bool,
    /// Whether a stop has been requested.
    pub stop_requested: bool,
    /// Current tick interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Seconds since start.
    pub elapsed_seconds: u64,
    /// Number of connected observers.
    pub observers: u64,
    /// Start time (RFC 3339).
    pub started_at: String,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn initial_state_is_not_stopped() {
        let state = OperatorState::new(1000);
        assert!(!state.is_stop_requested());
        assert_eq!(state.ticks_executed(), 0);
    }

    #[test]
    fn set_tick_interval() {
        let state = OperatorState::new(1000);
        assert_eq!(state.set_tick_interval_ms(2000), Some(1000));
        assert_eq!(state.tick_interval_ms(), 2000);
    }

    #[test]
    fn reject_sub_minimum_interval() {
        let state = OperatorState::new(1000);
        assert!(state.set_tick_interval_ms(50).is_none());
        assert_eq!(state.tick_interval_ms(), 1000);
    }

    #[test]
    fn initial_interval_is_raised_to_minimum() {
        assert_eq!(OperatorState::new(0).tick_interval_ms(), MIN_TICK_INTERVAL_MS);
        assert_eq!(OperatorState::new(50).tick_interval_ms(), MIN_TICK_INTERVAL_MS);
        assert_eq!(OperatorState::new(250).tick_interval_ms(), 250);
    }

    #[test]
    fn record_ticks() {
        let state = OperatorState::new(1000);
        state.record_tick();
        state.record_tick();
        assert_eq!(state.ticks_executed(), 2);
    }

    #[tokio::test]
    async fn stopped_wakes_on_request() {
        let state = Arc::new(OperatorState::new(1000));
        let waiter = {
            let state = Arc::clone(&state);
            tokio::spawn(async move { state.stopped().await })
        };
        tokio::task::yield_now().await;
        state.request_stop();
        let joined = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn stopped_returns_immediately_after_request() {
        let state = OperatorState::new(1000);
        state.request_stop();
        state.stopped().await;
        assert!(state.is_stop_requested());
    }
}
