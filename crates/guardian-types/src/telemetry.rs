//! The telemetry snapshot broadcast to observers once per tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::SystemStatus;

/// A point-in-time view of the simulated machine.
///
/// Built by the simulation loop after each executed tick, serialized once,
/// and fanned out to every registered observer. Snapshots are never
/// mutated after construction and are not retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TelemetrySnapshot {
    /// Index of the tick that produced this snapshot (starts at 1).
    pub tick: u64,
    /// Wall-clock time the snapshot was produced.
    pub timestamp: DateTime<Utc>,
    /// Identifier of the simulated unit.
    pub unit_id: String,
    /// Hour meter reading, rounded to two decimals.
    pub cumulative_operating_hours: f64,
    /// Hybrid DC bus voltage.
    pub hybrid_bus_voltage: f64,
    /// Capacitor current in amps, rounded to one decimal.
    pub capacitor_current: f64,
    /// Inverter temperature in degrees, rounded to one decimal.
    ///
    /// `risk_score` is classified from the unrounded temperature, so a
    /// reading published as `90.0` may already carry a score of `1.0`.
    pub inverter_temp: f64,
    /// Swing motor torque as a percentage of rated torque.
    pub swing_motor_torque: f64,
    /// Risk score, one of 0.0, 0.4, 0.7 or 1.0.
    pub risk_score: f64,
    /// Operator-facing status label.
    pub system_status: SystemStatus,
}

/// Round `value` to `places` decimal places for display on the wire.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}
