//! Simulation loop driver.
//!
//! [`run_simulation`] is the single periodic task of the process. Each
//! cycle it sleeps for the operator's tick interval, runs one
//! [`Machine::tick`], and hands the snapshot to the [`BroadcastHub`].
//! Paused cycles skip the tick and the broadcast but keep looping.
//!
//! Snapshots are produced and broadcast sequentially from this one task,
//! so every observer sees them in tick order. The loop ends only when the
//! operator requests a stop; a broadcast that is already underway
//! completes first.

use std::time::Duration;

use guardian_types::TelemetrySnapshot;
use tracing::{debug, info, trace};

use crate::hub::BroadcastHub;
use crate::machine::Machine;
use crate::operator::OperatorState;

/// Errors that can occur when starting the simulation loop.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Another loop is already driving this machine.
    #[error("a simulation loop is already running for this machine")]
    AlreadyRunning,
}

/// Result of a completed simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// Ticks executed by this run.
    pub total_ticks: u64,
    /// Cycles skipped because the machine was paused.
    pub paused_cycles: u64,
    /// The last snapshot broadcast, if any.
    pub final_snapshot: Option<TelemetrySnapshot>,
}

/// Run the tick loop until the operator requests a stop.
///
/// # Errors
///
/// Returns [`RunnerError::AlreadyRunning`] if another loop already holds
/// the machine.
pub async fn run_simulation(
    machine: &Machine,
    hub: &BroadcastHub,
    operator: &OperatorState,
) -> Result<SimulationResult, RunnerError> {
    let _guard = machine.claim_loop().ok_or(RunnerError::AlreadyRunning)?;

    let mut total_ticks: u64 = 0;
    let mut paused_cycles: u64 = 0;
    let mut final_snapshot: Option<TelemetrySnapshot> = None;

    info!(
        unit_id = %machine.identity().unit_id,
        tick_interval_ms = operator.tick_interval_ms(),
        "Simulation starting"
    );

    loop {
        let interval = Duration::from_millis(operator.tick_interval_ms());
        tokio::select! {
            biased;
            () = operator.stopped() => break,
            () = tokio::time::sleep(interval) => {}
        }

        let Some(snapshot) = machine.tick().await else {
            paused_cycles = paused_cycles.saturating_add(1);
            trace!("Machine paused, skipping tick");
            continue;
        };

        total_ticks = total_ticks.saturating_add(1);
        operator.record_tick();

        let report = hub.broadcast(&snapshot).await;
        debug!(
            tick = snapshot.tick,
            temp = snapshot.inverter_temp,
            status = %snapshot.system_status,
            delivered = report.delivered,
            skipped = report.skipped,
            dropped = report.dropped,
            "Snapshot broadcast"
        );

        final_snapshot = Some(snapshot);
    }

    Ok(SimulationResult {
        total_ticks,
        paused_cycles,
        final_snapshot,
    })
}

/// Log the end of a simulation run.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        total_ticks = result.total_ticks,
        paused_cycles = result.paused_cycles,
        final_tick = result.final_snapshot.as_ref().map(|s| s.tick),
        final_status = result.final_snapshot.as_ref().map(|s| s.system_status.as_str()),
        "Simulation ended"
    );
}
