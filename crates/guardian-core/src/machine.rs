//! The single synchronized owner of the simulated machine.
//!
//! [`Machine`] holds the [`MachineState`], the noise source, and the tick
//! counter behind one [`Mutex`]. The tick loop's read-transition-write and
//! every control operation (fault injection, derate, reset, pause, resume)
//! go through that lock, so no caller can observe a half-applied tick.
//!
//! Control operations only assign flags, so they never hold the lock
//! longer than the O(1) transition does.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use guardian_types::telemetry::round_to;
use guardian_types::{AckStatus, CommandAck, CommandKind, RiskBand, StatusAck, TelemetrySnapshot};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::GuardianConfig;
use crate::physics::{
    NOMINAL_TEMPERATURE, NoiseSource, RngNoise, ThermalModel, Transition, TransitionModel,
};
use crate::state::MachineState;

/// Fixed identity of the simulated unit, stamped on every snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitIdentity {
    /// Unit identifier.
    pub unit_id: String,
    /// Hybrid DC bus voltage.
    pub hybrid_bus_voltage: f64,
}

impl Default for UnitIdentity {
    fn default() -> Self {
        let config = GuardianConfig::default();
        Self {
            unit_id: config.simulation.unit_id,
            hybrid_bus_voltage: config.machine.hybrid_bus_voltage,
        }
    }
}

/// Everything guarded by the machine lock.
struct Core {
    state: MachineState,
    noise: Box<dyn NoiseSource>,
    tick: u64,
}

/// Shared handle to the simulated machine.
///
/// Wrap in [`Arc`](std::sync::Arc) to share between the tick loop and the
/// request handlers.
pub struct Machine {
    core: Mutex<Core>,
    model: Box<dyn TransitionModel>,
    identity: UnitIdentity,
    loop_claimed: AtomicBool,
}

impl core::fmt::Debug for Machine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Machine")
            .field("identity", &self.identity)
            .field("loop_claimed", &self.loop_claimed.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl Machine {
    /// Build the machine described by `config` with the default thermal
    /// model and seeded (or entropy-backed) noise.
    pub fn from_config(config: &GuardianConfig) -> Self {
        Self::new(
            MachineState::initial(&config.machine),
            Box::new(ThermalModel),
            Box::new(RngNoise::new(config.simulation.seed)),
            UnitIdentity {
                unit_id: config.simulation.unit_id.clone(),
                hybrid_bus_voltage: config.machine.hybrid_bus_voltage,
            },
        )
    }

    /// Assemble a machine from explicit parts.
    pub fn new(
        state: MachineState,
        model: Box<dyn TransitionModel>,
        noise: Box<dyn NoiseSource>,
        identity: UnitIdentity,
    ) -> Self {
        Self {
            core: Mutex::new(Core {
                state,
                noise,
                tick: 0,
            }),
            model,
            identity,
            loop_claimed: AtomicBool::new(false),
        }
    }

    /// The unit identity stamped on snapshots.
    pub const fn identity(&self) -> &UnitIdentity {
        &self.identity
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Run one tick of the physics and return the resulting snapshot.
    ///
    /// Returns `None` without touching the state when the machine is
    /// paused. The transition, the write-back, and the tick counter bump
    /// all happen under one lock acquisition.
    pub async fn tick(&self) -> Option<TelemetrySnapshot> {
        let mut core = self.core.lock().await;
        if !core.state.running {
            return None;
        }

        let Core { state, noise, tick } = &mut *core;
        let Transition {
            state: next,
            mode,
            readings,
        } = self.model.advance(state, noise.as_mut());
        *tick = tick.saturating_add(1);
        *state = next;

        Some(TelemetrySnapshot {
            tick: *tick,
            timestamp: Utc::now(),
            unit_id: self.identity.unit_id.clone(),
            cumulative_operating_hours: round_to(state.cumulative_operating_hours, 2),
            hybrid_bus_voltage: self.identity.hybrid_bus_voltage,
            capacitor_current: round_to(readings.capacitor_current, 1),
            inverter_temp: round_to(state.current_temperature, 1),
            swing_motor_torque: readings.swing_motor_torque,
            risk_score: round_to(state.risk_level(), 2),
            system_status: mode.status(),
        })
    }

    /// A consistent copy of the current state.
    pub async fn state(&self) -> MachineState {
        self.core.lock().await.state.clone()
    }

    /// The state together with the index of the last executed tick.
    pub async fn state_with_tick(&self) -> (MachineState, u64) {
        let core = self.core.lock().await;
        (core.state.clone(), core.tick)
    }

    /// Index of the last executed tick (0 before the first).
    pub async fn current_tick(&self) -> u64 {
        self.core.lock().await.tick
    }

    // -----------------------------------------------------------------------
    // Control surface
    // -----------------------------------------------------------------------

    /// Put the machine into critical fault mode.
    pub async fn inject_fault(&self) -> StatusAck {
        self.core.lock().await.state.fault_injected = true;
        info!("Fault injected");
        StatusAck {
            status: AckStatus::Chaos,
        }
    }

    /// Clear fault and derate modes and return the temperature to nominal.
    ///
    /// The hour meter and the running flag are untouched.
    pub async fn reset(&self) -> StatusAck {
        {
            let mut core = self.core.lock().await;
            let state = &mut core.state;
            state.fault_injected = false;
            state.derated = false;
            state.current_temperature = NOMINAL_TEMPERATURE;
            state.risk = RiskBand::classify(NOMINAL_TEMPERATURE);
        }
        info!("Machine reset");
        StatusAck {
            status: AckStatus::Normal,
        }
    }

    /// Derate the machine and echo the requested torque limit.
    pub async fn derate(&self, torque_limit: i64) -> CommandAck {
        {
            let mut core = self.core.lock().await;
            core.state.derated = true;
            core.state.last_torque_limit = Some(torque_limit);
        }
        info!(torque_limit, "Machine derated");
        CommandAck {
            command: CommandKind::SetTorqueLimit,
            value: torque_limit,
        }
    }

    /// Stop advancing the simulation. Returns whether it was running.
    pub async fn pause(&self) -> bool {
        let was_running = std::mem::replace(&mut self.core.lock().await.state.running, false);
        debug!(was_running, "Simulation paused");
        was_running
    }

    /// Resume advancing the simulation. Returns whether it was paused.
    pub async fn resume(&self) -> bool {
        let was_paused = !std::mem::replace(&mut self.core.lock().await.state.running, true);
        debug!(was_paused, "Simulation resumed");
        was_paused
    }

    /// Whether the simulation is currently advancing.
    pub async fn is_running(&self) -> bool {
        self.core.lock().await.state.running
    }

    // -----------------------------------------------------------------------
    // Loop ownership
    // -----------------------------------------------------------------------

    /// Claim the right to drive this machine's tick loop.
    ///
    /// Returns `None` if another loop already holds the claim. The claim
    /// is released when the guard is dropped.
    pub fn claim_loop(&self) -> Option<LoopGuard<'_>> {
        self.loop_claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| LoopGuard { machine: self })
    }
}

/// Exclusive claim on a machine's tick loop, released on drop.
#[derive(Debug)]
pub struct LoopGuard<'a> {
    machine: &'a Machine,
}

impl Drop for LoopGuard<'_> {
    fn drop(&mut self) {
        self.machine.loop_claimed.store(false, Ordering::Release);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use std::sync::Arc;

    use guardian_types::SystemStatus;

    use super::*;
    use crate::physics::FixedNoise;

    fn quiet_machine() -> Machine {
        Machine::new(
            MachineState::default(),
            Box::new(ThermalModel),
            Box::new(FixedNoise(0.0)),
            UnitIdentity::default(),
        )
    }

    #[tokio::test]
    async fn first_tick_matches_startup_scenario() {
        let machine = quiet_machine();
        let snapshot = machine.tick().await.unwrap();
        assert_eq!(snapshot.tick, 1);
        assert_eq!(snapshot.inverter_temp, 55.0);
        assert_eq!(snapshot.risk_score, 0.0);
        assert_eq!(snapshot.system_status, SystemStatus::Normal);
        assert_eq!(snapshot.unit_id, "HB-001");
        assert_eq!(snapshot.hybrid_bus_voltage, 580.0);
        assert_eq!(snapshot.cumulative_operating_hours, 4520.0);
        assert_eq!(machine.state().await.current_temperature, 55.0);
    }

    #[tokio::test]
    async fn fault_then_derate_then_reset() {
        let machine = quiet_machine();

        let ack = machine.inject_fault().await;
        assert_eq!(ack.status, AckStatus::Chaos);
        let mut last = machine.tick().await.unwrap();
        while last.inverter_temp <= 90.0 {
            last = machine.tick().await.unwrap();
        }
        assert_eq!(last.risk_score, 1.0);
        assert_eq!(last.system_status, SystemStatus::Critical);
        let hot = machine.state().await.current_temperature;

        let ack = machine.derate(50).await;
        assert_eq!(ack.value, 50);
        assert_eq!(ack.command, CommandKind::SetTorqueLimit);
        let derated = machine.tick().await.unwrap();
        assert_eq!(derated.system_status, SystemStatus::Derated);
        assert_eq!(machine.state().await.current_temperature, hot - 12.0);
        assert_eq!(machine.state().await.last_torque_limit, Some(50));

        let ack = machine.reset().await;
        assert_eq!(ack.status, AckStatus::Normal);
        let state = machine.state().await;
        assert!(!state.fault_injected);
        assert!(!state.derated);
        assert_eq!(state.current_temperature, 55.0);
        assert_eq!(state.risk, RiskBand::Green);
        let next = machine.tick().await.unwrap();
        assert_eq!(next.system_status, SystemStatus::Normal);
    }

    #[tokio::test]
    async fn risk_score_uses_unrounded_temperature() {
        let machine = Machine::new(
            MachineState {
                fault_injected: true,
                current_temperature: 89.04,
                risk: RiskBand::classify(89.04),
                ..MachineState::default()
            },
            Box::new(ThermalModel),
            Box::new(FixedNoise(0.0)),
            UnitIdentity::default(),
        );
        let snapshot = machine.tick().await.unwrap();
        assert_eq!(snapshot.inverter_temp, 90.0);
        assert_eq!(snapshot.risk_score, 1.0);
    }

    #[tokio::test]
    async fn reset_is_idempotent_and_keeps_hours() {
        let machine = quiet_machine();
        machine.inject_fault().await;
        machine.derate(30).await;
        for _ in 0..5 {
            machine.tick().await;
        }
        let hours = machine.state().await.cumulative_operating_hours;

        machine.reset().await;
        let once = machine.state().await;
        machine.reset().await;
        let twice = machine.state().await;
        assert_eq!(once, twice);
        assert_eq!(twice.cumulative_operating_hours, hours);
    }

    #[tokio::test]
    async fn paused_machine_does_not_advance() {
        let machine = quiet_machine();
        assert!(machine.pause().await);
        assert!(!machine.pause().await);
        let before = machine.state().await;
        assert!(machine.tick().await.is_none());
        assert_eq!(machine.state().await, before);
        assert_eq!(machine.current_tick().await, 0);

        assert!(machine.resume().await);
        assert!(machine.is_running().await);
        assert_eq!(machine.tick().await.unwrap().tick, 1);
    }

    #[tokio::test]
    async fn concurrent_controls_never_tear_a_tick() {
        let machine = Arc::new(quiet_machine());
        let mut handles = Vec::new();
        for i in 0..50_u32 {
            let machine = Arc::clone(&machine);
            handles.push(tokio::spawn(async move {
                match i % 3 {
                    0 => {
                        machine.inject_fault().await;
                    }
                    1 => {
                        machine.derate(40).await;
                    }
                    _ => {
                        machine.reset().await;
                    }
                }
                machine.tick().await
            }));
        }
        for handle in handles {
            let snapshot = handle.await.unwrap().unwrap();
            assert_eq!(
                snapshot.risk_score,
                RiskBand::classify(snapshot.inverter_temp).score()
            );
        }
        let (state, tick) = machine.state_with_tick().await;
        assert_eq!(tick, 50);
        assert_eq!(state.risk, RiskBand::classify(state.current_temperature));
    }

    #[test]
    fn loop_claim_is_exclusive() {
        let machine = quiet_machine();
        let guard = machine.claim_loop();
        assert!(guard.is_some());
        assert!(machine.claim_loop().is_none());
        drop(guard);
        assert!(machine.claim_loop().is_some());
    }
}
