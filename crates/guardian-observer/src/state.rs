//! Shared application state for the Observer API server.

use std::sync::Arc;
use std::time::Duration;

use guardian_core::config::ObserverConfig;
use guardian_core::hub::BroadcastHub;
use guardian_core::machine::Machine;
use guardian_core::operator::OperatorState;

/// Per-connection settings for `WebSocket` observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverSettings {
    /// Frames buffered per observer.
    pub channel_capacity: usize,
    /// Upper bound on a single `WebSocket` write.
    pub send_timeout: Duration,
}

impl From<&ObserverConfig> for ObserverSettings {
    fn from(config: &ObserverConfig) -> Self {
        Self {
            channel_capacity: config.channel_capacity,
            send_timeout: Duration::from_millis(config.send_timeout_ms),
        }
    }
}

impl Default for ObserverSettings {
    fn default() -> Self {
        Self::from(&ObserverConfig::default())
    }
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The simulated machine.
    pub machine: Arc<Machine>,
    /// Registry of connected `WebSocket` observers.
    pub hub: Arc<BroadcastHub>,
    /// Loop control state.
    pub operator: Arc<OperatorState>,
    /// Per-connection observer settings.
    pub settings: ObserverSettings,
}

impl AppState {
    /// Create application state around the shared simulation handles.
    pub const fn new(
        machine: Arc<Machine>,
        hub: Arc<BroadcastHub>,
        operator: Arc<OperatorState>,
        settings: ObserverSettings,
    ) -> Self {
        Self {
            machine,
            hub,
            operator,
            settings,
        }
    }
}
