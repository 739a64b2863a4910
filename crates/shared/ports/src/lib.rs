//! Marketsim Ports
//!
//! Port definitions (traits) for the marketsim simulator.
//! These define the boundaries between the matching kernel and the
//! collaborators that live outside it: trading agents and market observers.

mod agent;
mod error;
mod observer;
mod view;

pub use agent::Agent;
pub use error::{AgentError, AgentResult, BookError, BookResult};
pub use observer::{MarketObserver, TopOfBook};
pub use view::MarketView;
