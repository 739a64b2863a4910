use marketsim_core::{AgentId, MatchedOrder, Order, OrderId};

use crate::error::AgentResult;
use crate::view::MarketView;

/// Port for trading agents
///
/// Strategies live outside the kernel. The simulator only depends on this
/// capability set: it asks an agent for orders when the agent arrives, routes
/// the agent's fills back to it and reads its position value at the end.
pub trait Agent {
    /// Get agent's unique identifier
    fn id(&self) -> AgentId;

    /// Called when the agent arrives at the market.
    ///
    /// Returns the orders to submit (possibly none). Orders carry `view.time`
    /// as their time; the market rejects orders dated after its clock. An
    /// error aborts the run.
    fn take_action(&mut self, view: &MarketView) -> AgentResult<Vec<Order>>;

    /// Re-initialize internal state. Called once at the start of every run.
    fn reset(&mut self);

    /// Mark-to-market value of the current position
    fn pos_value(&self) -> f64;

    /// Called once per fill leg of one of this agent's orders
    fn on_fill(&mut self, _fill: &MatchedOrder) {}

    /// Orders to withdraw before the next `take_action`
    fn cancellations(&mut self) -> Vec<OrderId> {
        Vec::new()
    }

    /// Get agent type name (for logging)
    fn agent_type(&self) -> &'static str {
        "Agent"
    }
}
