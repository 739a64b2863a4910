//! Marketsim Market
//!
//! Owns one four-heap book, the simulation clock and the fundamental value
//! process, and publishes trades and top-of-book changes to observers.

pub mod error;
pub mod fundamental;
pub mod market;
pub mod recorder;

pub use error::{MarketError, MarketResult};
pub use fundamental::{FundamentalConfig, FundamentalProcess};
pub use market::Market;
pub use recorder::{EventRecorder, MarketEvent};
