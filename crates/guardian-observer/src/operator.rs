//! Operator REST API handlers for loop control.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/operator/pause` | Stop advancing the machine |
//! | `POST` | `/api/operator/resume` | Resume advancing the machine |
//! | `POST` | `/api/operator/speed` | Set tick interval (ms) |
//! | `GET` | `/api/operator/status` | Current loop status |
//! | `POST` | `/api/operator/stop` | Stop the tick loop |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use guardian_core::operator::{MIN_TICK_INTERVAL_MS, SimulationStatus};

use crate::error::ObserverError;
use crate::state::AppState;

/// Request body for `POST /api/operator/speed`.
#[derive(Debug, serde::Deserialize)]
pub struct SetSpeedRequest {
    /// New tick interval in milliseconds.
    pub tick_interval_ms: u64,
}

/// Generic success response.
#[derive(Debug, serde::Serialize)]
struct OperatorResponse {
    /// Whether the operation succeeded.
    ok: bool,
    /// Human-readable message.
    message: String,
}

/// Pause the simulation. The loop keeps cycling but skips ticks.
pub async fn pause(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let was_running = state.machine.pause().await;
    Json(OperatorResponse {
        ok: true,
        message: if was_running {
            "Simulation paused".to_owned()
        } else {
            "Simulation already paused".to_owned()
        },
    })
}

/// Resume the simulation after a pause.
pub async fn resume(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let was_paused = state.machine.resume().await;
    Json(OperatorResponse {
        ok: true,
        message: if was_paused {
            "Simulation resumed".to_owned()
        } else {
            "Simulation already running".to_owned()
        },
    })
}

/// Change the tick interval. Takes effect from the next sleep.
pub async fn set_speed(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetSpeedRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let prev = state
        .operator
        .set_tick_interval_ms(body.tick_interval_ms)
        .ok_or_else(|| {
            ObserverError::InvalidInput(format!(
                "tick_interval_ms must be at least {MIN_TICK_INTERVAL_MS}"
            ))
        })?;

    Ok(Json(serde_json::json!({
        "ok": true,
        "message": format!("Tick interval changed from {}ms to {}ms", prev, body.tick_interval_ms),
        "previous_interval_ms": prev,
        "new_interval_ms": body.tick_interval_ms,
    })))
}

/// Return the current loop status.
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (machine, tick) = state.machine.state_with_tick().await;
    let observers = u64::try_from(state.hub.observer_count().await).unwrap_or(u64::MAX);

    Json(SimulationStatus {
        tick,
        paused: !machine.running,
        stop_requested: state.operator.is_stop_requested(),
        tick_interval_ms: state.operator.tick_interval_ms(),
        elapsed_seconds: state.operator.elapsed_seconds(),
        observers,
        started_at: state.operator.started_at().to_rfc3339(),
    })
}

/// Stop the tick loop.
///
/// Once the loop returns, the engine disconnects every observer and shuts
/// the HTTP server down.
pub async fn stop(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.operator.request_stop();
    Json(OperatorResponse {
        ok: true,
        message: "Stop requested -- simulation will end after current tick".to_owned(),
    })
}
