use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::values::Price;

/// Order side (Buy or Sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// +1 for buys, -1 for sells
    pub fn sign(&self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }

    /// Compare two prices from this side's point of view.
    ///
    /// `Greater` means `a` is the more aggressive (higher priority) price:
    /// higher for buyers, lower for sellers.
    pub fn price_priority(&self, a: Price, b: Price) -> Ordering {
        match self {
            Side::Buy => a.total_cmp(&b),
            Side::Sell => b.total_cmp(&a),
        }
    }

    /// Whether an order on this side at `price` can trade against a resting
    /// order on the opposite side at `resting`.
    pub fn crosses(&self, price: Price, resting: Price) -> bool {
        match self {
            Side::Buy => price >= resting,
            Side::Sell => price <= resting,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}
