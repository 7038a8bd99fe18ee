//! fairsend-sim — hosts a `World` and drives it.
//!
//! - **`generator`** — random client populations from `SimConfig`
//! - **`simulation`** — the command surface (init, clear, add, remove, start/stop)
//! - **`driver`** — periodic tick source serializing ticks and commands on one task

pub mod driver;
pub mod generator;
pub mod simulation;

pub use driver::{DriverError, DriverHandle, spawn};
pub use generator::WorkloadGenerator;
pub use simulation::{Command, CommandParseError, Simulation};
