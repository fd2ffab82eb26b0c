//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{control, handlers, operator, ws};

/// Build the complete Axum router for the Observer server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws` -- `WebSocket` telemetry stream
/// - `POST /simulation/inject-fault`, `POST /simulation/reset`,
///   `POST /iot/derate` -- machine control
/// - `GET /api/machine` -- current machine state
/// - `/api/operator/*` -- loop control
/// - `/vision/*`, `/inventory/check`, `/service/ticket`,
///   `/field-service/dispatch` -- status queries
///
/// CORS allows any origin so dashboards can be served from anywhere.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws", get(ws::ws_telemetry))
        // Machine control
        .route("/simulation/inject-fault", post(control::inject_fault))
        .route("/simulation/reset", post(control::reset))
        .route("/iot/derate", post(control::derate))
        // Machine state
        .route("/api/machine", get(handlers::get_machine))
        // Operator
        .route("/api/operator/pause", post(operator::pause))
        .route("/api/operator/resume", post(operator::resume))
        .route("/api/operator/speed", post(operator::set_speed))
        .route("/api/operator/status", get(operator::status))
        .route("/api/operator/stop", post(operator::stop))
        // Status queries
        .route("/vision/camera", get(handlers::camera))
        .route("/vision/validate", get(handlers::validate_vision))
        .route("/inventory/check", get(handlers::check_inventory))
        .route("/service/ticket", post(handlers::create_ticket))
        .route("/field-service/dispatch", post(handlers::dispatch_technician))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
