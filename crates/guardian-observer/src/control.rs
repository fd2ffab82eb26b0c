//! Control endpoints that alter the simulated machine.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/simulation/inject-fault` | Enter critical fault mode |
//! | `POST` | `/simulation/reset` | Clear fault and derate, temperature to nominal |
//! | `POST` | `/iot/derate` | Derate and echo the torque limit |
//!
//! Changes land under the machine lock and show up in the snapshot of the
//! next executed tick.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;

use crate::error::ObserverError;
use crate::state::AppState;

/// Query parameters for `POST /iot/derate`.
#[derive(Debug, serde::Deserialize)]
pub struct DerateQuery {
    /// Requested swing motor torque limit, percent of rated.
    #[serde(default = "default_torque_limit")]
    pub torque_limit: i64,
}

const fn default_torque_limit() -> i64 {
    50
}

/// Inject a critical fault.
pub async fn inject_fault(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.machine.inject_fault().await)
}

/// Reset the machine to normal operation.
pub async fn reset(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.machine.reset().await)
}

/// Derate the machine.
///
/// The torque limit is echoed back as the outbound command value. Negative
/// limits are rejected before the machine is touched.
pub async fn derate(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DerateQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    if query.torque_limit < 0 {
        return Err(ObserverError::InvalidInput(format!(
            "torque_limit must not be negative (got {})",
            query.torque_limit
        )));
    }
    Ok(Json(state.machine.derate(query.torque_limit).await))
}
