//! Acknowledgement payloads returned by the control endpoints.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Mode named in a [`StatusAck`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AckStatus {
    /// Fault injection is active.
    Chaos,
    /// The machine was returned to normal operation.
    Normal,
}

/// Acknowledgement for fault injection and reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StatusAck {
    /// The resulting mode.
    pub status: AckStatus,
}

/// Outbound command named in a [`CommandAck`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    /// Limit swing motor torque to the given percentage.
    SetTorqueLimit,
}

/// Acknowledgement for a derate command, echoing the requested limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CommandAck {
    /// The command that was issued.
    pub command: CommandKind,
    /// The value sent with the command.
    pub value: i64,
}
