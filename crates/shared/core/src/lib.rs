//! Marketsim Core Domain
//!
//! Pure domain types for the marketsim double-auction simulator.
//! This crate contains no I/O and no randomness, and is 100% unit testable.

pub mod entities;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{MatchedOrder, Order, Side};
pub use values::{AgentId, OrderId, Price, Quantity, Timestamp};
