//! # eVTOL Fleet Simulator
//!
//! A concurrent simulation of an electric aircraft fleet cycling through flight,
//! charge queueing, charging and maintenance while contending for three shared
//! chargers, with scheduled fault injection and periodic telemetry.
//!
//! ## Features
//!
//! - **Per-aircraft state machine**: flight, charge queue, charging and
//!   maintenance with interrupt/resume
//! - **Charger arbitration**: strict FIFO queue, releases resolved before
//!   assignments each tick, immediate preemption on fault
//! - **Fault injection**: exponential arrivals per company, delivered one at a
//!   time in schedule order
//! - **Virtual clock**: every periodic task fires on its own interval over one
//!   shared elapsed-time counter
//! - **Telemetry**: append-only text lines in a fixed field order
//!
//! ## Quick Start
//!
//! ```rust
//! use fleetsim::{Simulation, SimulationConfig};
//! use fleetsim::telemetry::NullSink;
//!
//! let config = SimulationConfig {
//!     seed: Some(7),
//!     horizon_hours: 0.5,
//!     ..SimulationConfig::default()
//! };
//! let mut sim = Simulation::new(config, Box::new(NullSink)).unwrap();
//! let report = sim.run_stepped(15_000);
//! assert_eq!(report.summary.companies.len(), 5);
//! ```
//!
//! ## Architecture
//!
//! - [`clock`] - Virtual clock and periodic task cadence
//! - [`fleet`] - Aircraft arena, state machine and charger manager
//! - [`signals`] - Per-aircraft fault and charge signal cells
//! - [`charge_queue`] - FIFO charge request queue
//! - [`fault_injection`] / [`scheduler`] - Fault schedule generation and delivery
//! - [`worker`] - Per-aircraft execution units
//! - [`simulation`] - Driver loop and public entry point
//! - [`telemetry`] / [`summary`] - Output

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]

pub mod charge_queue;
pub mod clock;
pub mod config;
pub mod fault;
pub mod fault_injection;
pub mod fleet;
pub mod rng;
pub mod scheduler;
pub mod signals;
pub mod simulation;
pub mod summary;
pub mod telemetry;
pub mod worker;

// Re-export main public types for convenience
pub use config::{ConfigError, SimulationConfig};
pub use fleet::{AircraftId, AircraftStatus, ChargerId, Company, Fleet};
pub use simulation::{SimError, Simulation, SimulationReport};
