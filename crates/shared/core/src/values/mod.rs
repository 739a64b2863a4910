use serde::{Deserialize, Serialize};

/// Price value. Prices are simulated, so plain floating point is enough.
pub type Price = f64;

/// Quantity value. Always strictly positive while an order rests in a book.
pub type Quantity = f64;

/// Simulated time, in discrete steps
pub type Timestamp = u64;

/// Unique identifier for an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl OrderId {
    /// Pack an agent id and a per-agent sequence number into one order id.
    ///
    /// Ids composed for distinct `(agent, seq)` pairs never collide. The agent
    /// id must fit in 32 bits.
    pub const fn compose(agent: AgentId, seq: u32) -> Self {
        debug_assert!(agent.0 <= u32::MAX as u64, "agent id exceeds 32 bits");
        Self((agent.0 << 32) | seq as u64)
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub u64);

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "agent-{}", self.0)
    }
}
