use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::Side;
use crate::values::{AgentId, OrderId, Price, Quantity, Timestamp};

/// A priced request to trade, as submitted by an agent.
///
/// Orders are values: the matching engine never edits one in place, it
/// replaces it with a copy carrying a different quantity (see
/// [`Order::with_quantity`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
    pub agent_id: AgentId,
    /// Submission time
    pub time: Timestamp,
}

impl Order {
    pub fn new(
        order_id: OrderId,
        side: Side,
        price: Price,
        quantity: Quantity,
        agent_id: AgentId,
        time: Timestamp,
    ) -> Self {
        Self {
            order_id,
            side,
            price,
            quantity,
            agent_id,
            time,
        }
    }

    /// Create a buy order
    pub fn buy(
        order_id: OrderId,
        price: Price,
        quantity: Quantity,
        agent_id: AgentId,
        time: Timestamp,
    ) -> Self {
        Self::new(order_id, Side::Buy, price, quantity, agent_id, time)
    }

    /// Create a sell order
    pub fn sell(
        order_id: OrderId,
        price: Price,
        quantity: Quantity,
        agent_id: AgentId,
        time: Timestamp,
    ) -> Self {
        Self::new(order_id, Side::Sell, price, quantity, agent_id, time)
    }

    /// Copy of this order carrying a different quantity
    pub fn with_quantity(&self, quantity: Quantity) -> Self {
        Self { quantity, ..*self }
    }

    /// Reason this order cannot enter a book, if any
    pub fn validation_error(&self) -> Option<String> {
        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Some(format!("quantity must be positive, got {}", self.quantity));
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Some(format!("price must be positive, got {}", self.price));
        }
        None
    }

    /// Time priority: at the same price the earlier order wins.
    ///
    /// Side independent; `Greater` means `self` has priority over `other`.
    pub fn time_priority(&self, other: &Order) -> Ordering {
        other.time.cmp(&self.time)
    }
}
