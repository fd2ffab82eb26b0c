//! Engine binary for the Guardian telemetry simulator.
//!
//! Wires the machine, the broadcast hub, the Observer API server, and the
//! tick loop together, then runs until `Ctrl-C` or an operator stop.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `guardian-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (tracing)
//! 3. Create the machine, hub, and operator state
//! 4. Start the Observer API server
//! 5. Run the tick loop until stopped
//! 6. Disconnect observers and shut the server down

mod error;

use std::path::Path;
use std::sync::Arc;

use guardian_core::config::GuardianConfig;
use guardian_core::hub::BroadcastHub;
use guardian_core::machine::Machine;
use guardian_core::operator::OperatorState;
use guardian_core::runner;
use guardian_observer::server::ServerConfig;
use guardian_observer::state::{AppState, ObserverSettings};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Path of the optional configuration file.
const CONFIG_PATH: &str = "guardian-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, server startup, or the loop fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        unit_id = %config.simulation.unit_id,
        tick_interval_ms = config.simulation.tick_interval_ms,
        seeded = config.simulation.seed.is_some(),
        "guardian-engine starting"
    );

    // 3. Shared simulation handles.
    let machine = Arc::new(Machine::from_config(&config));
    let hub = Arc::new(BroadcastHub::new());
    let operator = Arc::new(OperatorState::new(config.simulation.tick_interval_ms));

    // 4. Observer API server.
    let app_state = Arc::new(AppState::new(
        Arc::clone(&machine),
        Arc::clone(&hub),
        Arc::clone(&operator),
        ObserverSettings::from(&config.observer),
    ));
    let server_config = ServerConfig {
        host: config.observer.host.clone(),
        port: config.observer.port,
    };
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server_handle = guardian_observer::spawn_observer(&server_config, app_state, async move {
        // Resolves on `true` or when the sender is dropped.
        let _ = shutdown_rx.wait_for(|stop| *stop).await;
    })
    .await?;

    // Ctrl-C requests the same clean stop as the operator endpoint.
    {
        let operator = Arc::clone(&operator);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Ctrl-C received, stopping simulation"),
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C, stopping simulation"),
            }
            operator.request_stop();
        });
    }

    // 5. Run the tick loop.
    let result = runner::run_simulation(&machine, &hub, &operator).await?;
    runner::log_simulation_end(&result);

    // 6. Shut down.
    let disconnected = hub.disconnect_all().await;
    let _ = shutdown_tx.send(true);
    if let Err(e) = server_handle.await {
        warn!(error = %e, "Observer server task failed");
    }

    info!(
        total_ticks = result.total_ticks,
        disconnected,
        "guardian-engine shutdown complete"
    );

    Ok(())
}

/// Load configuration from [`CONFIG_PATH`], falling back to defaults.
fn load_config() -> Result<GuardianConfig, EngineError> {
    let path = Path::new(CONFIG_PATH);
    if path.exists() {
        Ok(GuardianConfig::from_file(path)?)
    } else {
        let mut config = GuardianConfig::default();
        config.observer.apply_env_overrides();
        Ok(config)
    }
}
