//! Shared type definitions for the Guardian telemetry simulator.
//!
//! Everything that crosses the wire -- telemetry snapshots pushed to
//! observers and acknowledgements returned by control endpoints -- is
//! defined here. Types flow downstream to `TypeScript` via `ts-rs` for the
//! operator dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for identifiers
//! - [`enums`] -- System status and risk band classifications
//! - [`telemetry`] -- The per-tick [`TelemetrySnapshot`]
//! - [`control`] -- Control endpoint acknowledgement payloads

pub mod control;
pub mod enums;
pub mod ids;
pub mod telemetry;

pub use control::{AckStatus, CommandAck, CommandKind, StatusAck};
pub use enums::{RiskBand, SystemStatus};
pub use ids::ObserverId;
pub use telemetry::TelemetrySnapshot;
