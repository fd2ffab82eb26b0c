//! Machine state, physics, and real-time broadcast for the Guardian
//! telemetry simulator.
//!
//! This crate owns the only shared mutable state in the system -- the
//! simulated machine -- and the periodic loop that evolves it and fans the
//! result out to observers.
//!
//! # Modules
//!
//! - [`state`] -- [`MachineState`], the physical readings and mode flags.
//! - [`physics`] -- The state-transition function, operating-mode priority,
//!   and injectable noise sources.
//! - [`machine`] -- [`Machine`], the single synchronized owner of the state
//!   and the entry point for every control operation.
//! - [`hub`] -- [`BroadcastHub`], the registry of connected observers.
//! - [`operator`] -- Loop lifecycle controls (stop, tick speed).
//! - [`runner`] -- The simulation loop driver.
//! - [`config`] -- Configuration loading from `guardian-config.yaml`.
//!
//! [`MachineState`]: state::MachineState
//! [`Machine`]: machine::Machine
//! [`BroadcastHub`]: hub::BroadcastHub

pub mod config;
pub mod hub;
pub mod machine;
pub mod operator;
pub mod physics;
pub mod runner;
pub mod state;
