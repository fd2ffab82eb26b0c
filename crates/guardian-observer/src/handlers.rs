//! Read-only REST handlers for the Observer server.
//!
//! The status query endpoints are stateless responders: each takes one
//! consistent copy of the machine state (or none at all) and returns a
//! canned or lightly randomized payload.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/machine` | Current machine state |
//! | `GET` | `/vision/camera` | Camera frame for the unit |
//! | `GET` | `/vision/validate` | Fire detection verdict |
//! | `GET` | `/inventory/check` | Spare part availability |
//! | `POST` | `/service/ticket` | Open a service ticket |
//! | `POST` | `/field-service/dispatch` | Dispatch a technician |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse};
use chrono::{DateTime, Utc};
use guardian_core::physics::OperatingMode;
use guardian_core::state::MachineState;
use guardian_types::SystemStatus;
use uuid::Uuid;

use crate::state::AppState;

/// Placeholder frame returned while no fire is visible.
const IMG_CLEAN: &str = "IMAGE_DATA_CLEAN_OK";

/// Placeholder frame returned while a fault is injected.
const IMG_FIRE: &str = "IMAGE_DATA_FIRE_DETECTED_CRITICAL";

/// Part number of the capacitor module stocked for the unit.
const DEFAULT_PART_ID: &str = "KOM-204296";

// ---------------------------------------------------------------------------
// Query parameter / response structs
// ---------------------------------------------------------------------------

/// Current machine state served by `GET /api/machine`.
#[derive(Debug, serde::Serialize)]
pub struct MachineResponse {
    /// Index of the last executed tick.
    pub tick: u64,
    /// Status label for the current flags.
    pub system_status: SystemStatus,
    /// Numeric risk level.
    pub risk_level: f64,
    /// The machine state.
    #[serde(flatten)]
    pub state: MachineState,
}

/// Response for `GET /vision/camera`.
#[derive(Debug, serde::Serialize)]
pub struct CameraResponse {
    /// Encoded camera frame.
    pub image_base64: &'static str,
    /// `"FIRE"` or `"CLEAN"`.
    pub status: &'static str,
}

/// Response for `GET /vision/validate`.
#[derive(Debug, serde::Serialize)]
pub struct VisionResponse {
    /// Whether the vision model sees fire.
    pub fire_detected: bool,
    /// Model confidence.
    pub confidence: f64,
    /// Time of the verdict.
    pub timestamp: DateTime<Utc>,
    /// Camera the frame came from.
    pub camera_source: String,
}

/// Query parameters for `GET /inventory/check`.
#[derive(Debug, serde::Deserialize)]
pub struct InventoryQuery {
    /// Part number to look up.
    pub part_id: Option<String>,
}

/// Response for `GET /inventory/check`.
#[derive(Debug, serde::Serialize)]
pub struct InventoryResponse {
    /// Part number looked up.
    pub part_id: String,
    /// Units in stock.
    pub quantity_available: u32,
    /// Warehouse holding the stock.
    pub location: &'static str,
}

/// Query parameters for `POST /service/ticket`.
#[derive(Debug, serde::Deserialize)]
pub struct TicketQuery {
    /// Ticket severity (default `CRITICAL`).
    pub severity: Option<String>,
    /// Problem description (default `Thermal Runaway`).
    pub description: Option<String>,
}

/// Response for `POST /service/ticket`.
#[derive(Debug, serde::Serialize)]
pub struct TicketResponse {
    /// Generated case number.
    pub ticket_id: String,
    /// Ticket state.
    pub status: &'static str,
}

/// Query parameters for `POST /field-service/dispatch`.
#[derive(Debug, serde::Deserialize)]
pub struct DispatchQuery {
    /// Site the technician is sent to.
    pub location: Option<String>,
}

/// Response for `POST /field-service/dispatch`.
#[derive(Debug, serde::Serialize)]
pub struct DispatchResponse {
    /// Assigned technician.
    pub technician: &'static str,
    /// Estimated arrival.
    pub eta: &'static str,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing the live machine state.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (machine, tick) = state.machine.state_with_tick().await;
    let status = OperatingMode::of(&machine).status();
    let temperature = machine.current_temperature;
    let risk = machine.risk_level();
    let observers = state.hub.observer_count().await;
    let unit_id = &state.machine.identity().unit_id;
    let run_state = if machine.running { "RUNNING" } else { "PAUSED" };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Guardian Backend</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
    </style>
</head>
<body>
    <h1>Backend Active</h1>
    <p>Unit {unit_id} -- {run_state}</p>
    <div>
        <div class="metric"><div class="label">Tick</div><div class="value">{tick}</div></div>
        <div class="metric"><div class="label">Status</div><div class="value">{status}</div></div>
        <div class="metric"><div class="label">Inverter Temp</div><div class="value">{temperature:.1}</div></div>
        <div class="metric"><div class="label">Risk</div><div class="value">{risk:.1}</div></div>
        <div class="metric"><div class="label">Observers</div><div class="value">{observers}</div></div>
    </div>
    <p>Stream: <code>/ws</code></p>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /api/machine
// ---------------------------------------------------------------------------

/// Return a consistent copy of the machine state.
pub async fn get_machine(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (machine, tick) = state.machine.state_with_tick().await;
    Json(MachineResponse {
        tick,
        system_status: OperatingMode::of(&machine).status(),
        risk_level: machine.risk_level(),
        state: machine,
    })
}

// ---------------------------------------------------------------------------
// Vision
// ---------------------------------------------------------------------------

/// Return the current camera frame: fire while a fault is injected.
pub async fn camera(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let fire = state.machine.state().await.fault_injected;
    Json(CameraResponse {
        image_base64: if fire { IMG_FIRE } else { IMG_CLEAN },
        status: if fire { "FIRE" } else { "CLEAN" },
    })
}

/// Return the vision model's verdict on the current frame.
pub async fn validate_vision(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let fire_detected = state.machine.state().await.fault_injected;
    Json(VisionResponse {
        fire_detected,
        confidence: 0.99,
        timestamp: Utc::now(),
        camera_source: format!("{}-CAM", state.machine.identity().unit_id),
    })
}

// ---------------------------------------------------------------------------
// Inventory, ticketing, dispatch
// ---------------------------------------------------------------------------

/// Look up spare part stock.
pub async fn check_inventory(Query(query): Query<InventoryQuery>) -> impl IntoResponse {
    Json(InventoryResponse {
        part_id: query
            .part_id
            .unwrap_or_else(|| DEFAULT_PART_ID.to_owned()),
        quantity_available: 5,
        location: "Warehouse-Austin-01",
    })
}

/// Open a service ticket with a fresh case number.
pub async fn create_ticket(Query(query): Query<TicketQuery>) -> impl IntoResponse {
    let ticket_id = case_number(Uuid::new_v4());
    tracing::info!(
        %ticket_id,
        severity = query.severity.as_deref().unwrap_or("CRITICAL"),
        description = query.description.as_deref().unwrap_or("Thermal Runaway"),
        "Service ticket opened"
    );
    Json(TicketResponse {
        ticket_id,
        status: "OPEN",
    })
}

/// Dispatch a field technician.
pub async fn dispatch_technician(Query(query): Query<DispatchQuery>) -> impl IntoResponse {
    tracing::info!(
        location = query.location.as_deref().unwrap_or("Austin Site"),
        "Technician dispatched"
    );
    Json(DispatchResponse {
        technician: "Sarah Jenkins",
        eta: "2 hours",
    })
}

/// Format `CASE-` followed by the first eight hex digits of `id`, upper case.
fn case_number(id: Uuid) -> String {
    let prefix: String = id.simple().to_string().chars().take(8).collect();
    format!("CASE-{}", prefix.to_uppercase())
}
