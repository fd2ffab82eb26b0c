//! State-transition function for the simulated machine.
//!
//! Each executed tick maps the current [`MachineState`] to the next one:
//!
//! 1. Resolve the [`OperatingMode`] from the mode flags (derated wins over
//!    fault, fault wins over normal).
//! 2. Move the temperature one step toward the mode's target: slow heating
//!    with a small random jitter, slow cooling normally, fast cooling when
//!    derated.
//! 3. Clamp at [`TEMPERATURE_FLOOR`].
//! 4. Classify the risk band from the clamped temperature.
//! 5. Select the secondary readings (torque, capacitor current) for the mode.
//! 6. Advance the hour meter by [`HOURS_PER_TICK`].
//! 7. Label the status from the same mode used in step 1.
//!
//! The only source of non-determinism is the [`NoiseSource`] passed in,
//! so tests can pin it with [`FixedNoise`].

use guardian_types::{RiskBand, SystemStatus};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::state::MachineState;

/// Hard lower bound on the inverter temperature.
pub const TEMPERATURE_FLOOR: f64 = 20.0;

/// Target temperature in normal operation, also the reset temperature.
pub const NOMINAL_TEMPERATURE: f64 = 55.0;

/// Target temperature while a fault is injected.
pub const FAULT_TEMPERATURE: f64 = 150.0;

/// Target temperature while derated.
pub const DERATED_TEMPERATURE: f64 = 45.0;

/// Fixed part of the per-tick temperature rise.
pub const HEATING_STEP: f64 = 1.0;

/// Upper bound of the random part of the per-tick temperature rise.
pub const HEATING_JITTER: f64 = 0.5;

/// Per-tick temperature drop in normal and fault modes.
pub const COOLING_STEP: f64 = 1.0;

/// Per-tick temperature drop while derated.
pub const DERATED_COOLING_STEP: f64 = 12.0;

/// Hour meter increment per executed tick.
pub const HOURS_PER_TICK: f64 = 0.0002;

// ---------------------------------------------------------------------------
// Noise
// ---------------------------------------------------------------------------

/// Source of the bounded random perturbations applied by the physics.
pub trait NoiseSource: Send {
    /// Return a fraction in `[0, 1)`.
    fn fraction(&mut self) -> f64;
}

/// Draw uniformly from `[low, high)` using `noise`.
pub fn uniform(noise: &mut dyn NoiseSource, low: f64, high: f64) -> f64 {
    (high - low).mul_add(noise.fraction(), low)
}

/// Noise backed by a seedable pseudo-random generator.
#[derive(Debug, Clone)]
pub struct RngNoise {
    rng: SmallRng,
}

impl RngNoise {
    /// Create a noise source, seeded for reproducible runs when `seed` is
    /// given and from OS entropy otherwise.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(SmallRng::from_os_rng, SmallRng::seed_from_u64);
        Self { rng }
    }
}

impl NoiseSource for RngNoise {
    fn fraction(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Noise that always returns the same fraction.
///
/// `FixedNoise(0.0)` pins every perturbation at the low end of its range.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedNoise(pub f64);

impl NoiseSource for FixedNoise {
    fn fraction(&mut self) -> f64 {
        self.0.clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Operating mode
// ---------------------------------------------------------------------------

/// The mode the physics runs in, resolved once per tick from the flags.
///
/// Target temperature, cooling rate, secondary readings, and the status
/// label all derive from this value so they can never disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    /// Reduced capacity. Takes precedence over a fault.
    Derated,
    /// Critical fault injected.
    Fault,
    /// Neither flag set.
    Normal,
}

impl OperatingMode {
    /// Resolve the mode from the flags, derated first.
    pub const fn resolve(derated: bool, fault_injected: bool) -> Self {
        if derated {
            Self::Derated
        } else if fault_injected {
            Self::Fault
        } else {
            Self::Normal
        }
    }

    /// Resolve the mode of a machine state.
    pub const fn of(state: &MachineState) -> Self {
        Self::resolve(state.derated, state.fault_injected)
    }

    /// Temperature the machine drifts toward in this mode.
    pub const fn target_temperature(self) -> f64 {
        match self {
            Self::Derated => DERATED_TEMPERATURE,
            Self::Fault => FAULT_TEMPERATURE,
            Self::Normal => NOMINAL_TEMPERATURE,
        }
    }

    /// Per-tick temperature drop when above target.
    pub const fn cooling_step(self) -> f64 {
        match self {
            Self::Derated => DERATED_COOLING_STEP,
            Self::Fault | Self::Normal => COOLING_STEP,
        }
    }

    /// Status label published for this mode.
    pub const fn status(self) -> SystemStatus {
        match self {
            Self::Derated => SystemStatus::Derated,
            Self::Fault => SystemStatus::Critical,
            Self::Normal => SystemStatus::Normal,
        }
    }

    /// Swing motor torque and capacitor current for this mode.
    pub fn secondary_readings(self, noise: &mut dyn NoiseSource) -> SecondaryReadings {
        match self {
            Self::Derated => SecondaryReadings {
                swing_motor_torque: 50.0,
                capacitor_current: 60.0,
            },
            Self::Fault => SecondaryReadings {
                swing_motor_torque: 100.0,
                capacitor_current: 150.0 + uniform(noise, -20.0, 20.0),
            },
            Self::Normal => SecondaryReadings {
                swing_motor_torque: 100.0,
                capacitor_current: 40.0 + uniform(noise, -2.0, 2.0),
            },
        }
    }
}

/// Readings that depend on the mode but never feed back into temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecondaryReadings {
    /// Swing motor torque, percent of rated.
    pub swing_motor_torque: f64,
    /// Capacitor current in amps.
    pub capacitor_current: f64,
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

/// Result of one tick of the physics.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// The next machine state.
    pub state: MachineState,
    /// The mode the tick ran in.
    pub mode: OperatingMode,
    /// Mode-dependent secondary readings.
    pub readings: SecondaryReadings,
}

impl Transition {
    /// Status label for the tick.
    pub const fn status(&self) -> SystemStatus {
        self.mode.status()
    }
}

/// A pluggable state-transition function.
///
/// Implementations must be total: every input state yields a next state
/// whose temperature is at or above [`TEMPERATURE_FLOOR`] and whose risk
/// band matches that temperature.
pub trait TransitionModel: Send + Sync {
    /// Compute the state after one tick.
    fn advance(&self, state: &MachineState, noise: &mut dyn NoiseSource) -> Transition;
}

/// The default heavy-equipment thermal model.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThermalModel;

impl TransitionModel for ThermalModel {
    fn advance(&self, state: &MachineState, noise: &mut dyn NoiseSource) -> Transition {
        let mode = OperatingMode::of(state);
        let target = mode.target_temperature();
        let current = state.current_temperature;

        let moved = if current < target {
            current + HEATING_STEP + uniform(noise, 0.0, HEATING_JITTER)
        } else if current > target {
            current - mode.cooling_step()
        } else {
            current
        };
        let temperature = moved.max(TEMPERATURE_FLOOR);

        let readings = mode.secondary_readings(noise);

        let next = MachineState {
            risk: RiskBand::classify(temperature),
            current_temperature: temperature,
            cumulative_operating_hours: state.cumulative_operating_hours + HOURS_PER_TICK,
            ..state.clone()
        };

        Transition {
            state: next,
            mode,
            readings,
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn state_at(temperature: f64) -> MachineState {
        MachineState {
            current_temperature: temperature,
            risk: RiskBand::classify(temperature),
            ..MachineState::default()
        }
    }

    #[test]
    fn derated_wins_over_fault() {
        let mode = OperatingMode::resolve(true, true);
        assert_eq!(mode, OperatingMode::Derated);
        assert_eq!(mode.target_temperature(), 45.0);
        assert_eq!(mode.status(), SystemStatus::Derated);
        assert_eq!(OperatingMode::resolve(false, true).status(), SystemStatus::Critical);
        assert_eq!(OperatingMode::resolve(false, false).status(), SystemStatus::Normal);
    }

    #[test]
    fn first_tick_from_startup_with_minimum_noise() {
        let mut noise = FixedNoise(0.0);
        let next = ThermalModel.advance(&MachineState::default(), &mut noise);
        // Startup sits exactly on the normal target.
        assert_eq!(next.state.current_temperature, 55.0);
        assert_eq!(next.state.risk_level(), 0.0);
        assert_eq!(next.status(), SystemStatus::Normal);
        assert_eq!(next.readings.capacitor_current, 38.0);
        assert_eq!(next.readings.swing_motor_torque, 100.0);
    }

    #[test]
    fn heats_one_degree_with_minimum_noise() {
        let mut noise = FixedNoise(0.0);
        let fault = MachineState {
            fault_injected: true,
            ..MachineState::default()
        };
        let next = ThermalModel.advance(&fault, &mut noise);
        assert_eq!(next.state.current_temperature, 56.0);

        let cool = ThermalModel.advance(&state_at(54.0), &mut noise);
        assert_eq!(cool.state.current_temperature, 55.0);
        assert_eq!(cool.status(), SystemStatus::Normal);
    }

    #[test]
    fn heating_jitter_is_bounded() {
        let mut noise = FixedNoise(1.0);
        let next = ThermalModel.advance(&state_at(30.0), &mut noise);
        assert_eq!(next.state.current_temperature, 31.5);
    }

    #[test]
    fn at_target_temperature_holds() {
        let mut noise = FixedNoise(0.5);
        let next = ThermalModel.advance(&state_at(DERATED_TEMPERATURE), &mut noise);
        assert!(next.state.current_temperature > DERATED_TEMPERATURE);

        let derated = MachineState {
            derated: true,
            ..state_at(DERATED_TEMPERATURE)
        };
        let held = ThermalModel.advance(&derated, &mut noise);
        assert_eq!(held.state.current_temperature, DERATED_TEMPERATURE);
    }

    #[test]
    fn derated_cools_fast_and_fault_cools_slow() {
        let mut noise = FixedNoise(0.0);
        let derated = MachineState {
            derated: true,
            fault_injected: true,
            ..state_at(100.0)
        };
        let next = ThermalModel.advance(&derated, &mut noise);
        assert_eq!(next.state.current_temperature, 88.0);
        assert_eq!(next.state.risk, RiskBand::Orange);
        assert_eq!(next.status(), SystemStatus::Derated);
        assert_eq!(next.readings.swing_motor_torque, 50.0);
        assert_eq!(next.readings.capacitor_current, 60.0);

        let hot_normal = ThermalModel.advance(&state_at(100.0), &mut noise);
        assert_eq!(hot_normal.state.current_temperature, 99.0);
    }

    #[test]
    fn floor_clamps_temperature() {
        let mut noise = FixedNoise(0.0);
        let cold = MachineState {
            derated: true,
            ..state_at(25.0)
        };
        // Below the derated target, so the machine heats rather than cools.
        let heated = ThermalModel.advance(&cold, &mut noise);
        assert_eq!(heated.state.current_temperature, 26.0);

        let below_floor = MachineState {
            current_temperature: 5.0,
            ..MachineState::default()
        };
        let next = ThermalModel.advance(&below_floor, &mut noise);
        assert_eq!(next.state.current_temperature, TEMPERATURE_FLOOR);
    }

    #[test]
    fn floor_and_risk_hold_over_many_ticks() {
        let mut noise = RngNoise::new(Some(7));
        let mut state = MachineState::default();
        for step in 0..400_u32 {
            state.fault_injected = step < 150;
            state.derated = (150..250).contains(&step);
            let next = ThermalModel.advance(&state, &mut noise);
            state = next.state;
            assert!(state.current_temperature >= TEMPERATURE_FLOOR);
            assert_eq!(state.risk, RiskBand::classify(state.current_temperature));
            assert!([0.0, 0.4, 0.7, 1.0].contains(&state.risk_level()));
        }
    }

    #[test]
    fn fault_drives_machine_into_red() {
        let mut noise = FixedNoise(0.0);
        let mut state = MachineState {
            fault_injected: true,
            ..MachineState::default()
        };
        let mut ticks = 0_u32;
        while state.current_temperature <= 90.0 {
            let next = ThermalModel.advance(&state, &mut noise);
            assert_eq!(next.status(), SystemStatus::Critical);
            state = next.state;
            ticks += 1;
        }
        assert_eq!(ticks, 36);
        assert_eq!(state.risk_level(), 1.0);
    }

    #[test]
    fn hours_advance_regardless_of_mode() {
        let mut noise = FixedNoise(0.0);
        for (derated, fault) in [(false, false), (false, true), (true, false), (true, true)] {
            let state = MachineState {
                derated,
                fault_injected: fault,
                ..MachineState::default()
            };
            let next = ThermalModel.advance(&state, &mut noise);
            assert!(next.state.cumulative_operating_hours > state.cumulative_operating_hours);
        }
    }

    #[test]
    fn seeded_noise_is_reproducible() {
        let mut a = RngNoise::new(Some(42));
        let mut b = RngNoise::new(Some(42));
        for _ in 0..10 {
            let x = a.fraction();
            assert_eq!(x, b.fraction());
            assert!((0.0..1.0).contains(&x));
        }
    }
}
