//! Observer API server for the Guardian telemetry simulator.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws`) streaming one telemetry snapshot per
//!   tick through the [`BroadcastHub`]
//! - **Control endpoints** that alter the simulated machine (inject fault,
//!   reset, derate)
//! - **Operator endpoints** for loop control (pause, resume, speed,
//!   status, stop)
//! - **Status query endpoints** (vision, inventory, ticketing, dispatch)
//!   that read the machine's flags and return canned responses
//! - **Minimal HTML page** (`GET /`) showing the live machine state
//!
//! # Architecture
//!
//! Handlers share one [`AppState`] holding `Arc`s to the machine, the hub,
//! and the operator state. Every machine access goes through the
//! machine's own lock; the handlers never keep state of their own.
//!
//! [`BroadcastHub`]: guardian_core::hub::BroadcastHub

pub mod control;
pub mod error;
pub mod handlers;
pub mod operator;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::{StartupError, spawn_observer};
pub use state::{AppState, ObserverSettings};
