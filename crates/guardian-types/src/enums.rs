//! Classification enums carried in every telemetry snapshot.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Operator-facing status label of the machine.
///
/// Serialized in upper case (`"NORMAL"`, `"CRITICAL"`, `"DERATED"`) to
/// match what existing dashboards expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemStatus {
    /// No fault and no derate in effect.
    Normal,
    /// A critical fault has been injected.
    Critical,
    /// The machine is running at reduced capacity.
    Derated,
}

impl SystemStatus {
    /// The wire label for this status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Critical => "CRITICAL",
            Self::Derated => "DERATED",
        }
    }
}

impl core::fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thermal risk band derived from the inverter temperature.
///
/// Bands are ordered from safest to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskBand {
    /// At or below 70 degrees.
    Green,
    /// Above 70 degrees.
    Yellow,
    /// Above 80 degrees.
    Orange,
    /// Above 90 degrees.
    Red,
}

impl RiskBand {
    /// Classify a temperature into its risk band.
    ///
    /// Thresholds are strict: exactly 90.0 is still [`RiskBand::Orange`].
    pub const fn classify(temperature: f64) -> Self {
        if temperature > 90.0 {
            Self::Red
        } else if temperature > 80.0 {
            Self::Orange
        } else if temperature > 70.0 {
            Self::Yellow
        } else {
            Self::Green
        }
    }

    /// The risk score published for this band.
    pub const fn score(self) -> f64 {
        match self {
            Self::Green => 0.0,
            Self::Yellow => 0.4,
            Self::Orange => 0.7,
            Self::Red => 1.0,
        }
    }
}
