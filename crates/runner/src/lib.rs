//! Marketsim Runner
//!
//! Drives a population of agents against one market:
//!
//! - **Config**: JSON-loadable run parameters
//! - **Arrival**: per-agent Poisson arrival process on the integer clock
//! - **Simulation**: the event loop and its results
//!
//! ```text
//!   schedule (time, agent) ──► Simulator ──► Market::submit_order ──► FourHeap::insert
//!                                 ▲                  │
//!                                 └── Agent::on_fill ◄┘ fills
//! ```

pub mod arrival;
pub mod config;
pub mod error;
pub mod simulation;

// Re-export main types
pub use arrival::ArrivalProcess;
pub use config::{AgentParams, ConfigError, SimulationConfig};
pub use error::{SimulationError, SimulationResult};
pub use simulation::{SimulationResults, Simulator};
