use serde::{Deserialize, Serialize};

use super::Order;
use crate::values::{Price, Quantity, Timestamp};

/// One leg of a fill produced by the matching engine.
///
/// `order` carries the filled quantity only, not the original order size.
/// Every trade produces two legs, one per side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchedOrder {
    pub order: Order,
    /// Execution price (the resting order's price)
    pub price: Price,
    /// Market time at which the fill executed
    pub time: Timestamp,
}

impl MatchedOrder {
    pub fn new(order: Order, price: Price, time: Timestamp) -> Self {
        Self { order, price, time }
    }

    /// Filled quantity
    pub fn quantity(&self) -> Quantity {
        self.order.quantity
    }

    /// Position change for the owner: positive when bought, negative when sold
    pub fn signed_quantity(&self) -> Quantity {
        self.order.side.sign() * self.order.quantity
    }

    /// Cash change for the owner: negative when bought, positive when sold
    pub fn cash_flow(&self) -> f64 {
        -self.signed_quantity() * self.price
    }
}
