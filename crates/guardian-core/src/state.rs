//! The simulated machine's physical readings and mode flags.

use guardian_types::RiskBand;
use serde::Serialize;

use crate::config::MachineConfig;

/// Current physical readings and mode flags of the simulated machine.
///
/// A single instance lives inside [`Machine`](crate::machine::Machine) for
/// the lifetime of the process. `risk` is always the classification of
/// `current_temperature`; nothing sets it independently.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineState {
    /// Whether the simulation advances at all.
    pub running: bool,
    /// Critical fault mode, set by fault injection.
    pub fault_injected: bool,
    /// Reduced-capacity mode, set by a derate command.
    pub derated: bool,
    /// Risk band of the current temperature.
    pub risk: RiskBand,
    /// Inverter temperature carried from tick to tick.
    pub current_temperature: f64,
    /// Hour meter, only ever increases.
    pub cumulative_operating_hours: f64,
    /// Most recent torque limit requested by a derate command.
    ///
    /// Informational only; the physics reads the `derated` flag.
    pub last_torque_limit: Option<i64>,
}

impl MachineState {
    /// Create the start-of-process state from configuration.
    pub fn initial(config: &MachineConfig) -> Self {
        Self {
            running: true,
            fault_injected: false,
            derated: false,
            risk: RiskBand::classify(config.initial_temperature),
            current_temperature: config.initial_temperature,
            cumulative_operating_hours: config.initial_operating_hours,
            last_torque_limit: None,
        }
    }

    /// Numeric risk level in `[0, 1]`.
    pub const fn risk_level(&self) -> f64 {
        self.risk.score()
    }
}

impl Default for MachineState {
    fn default() -> Self {
        Self::initial(&MachineConfig::default())
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_startup_values() {
        let state = MachineState::default();
        assert!(state.running);
        assert!(!state.fault_injected);
        assert!(!state.derated);
        assert_eq!(state.current_temperature, 55.0);
        assert_eq!(state.cumulative_operating_hours, 4520.0);
        assert_eq!(state.risk, RiskBand::Green);
        assert_eq!(state.risk_level(), 0.0);
    }
}
