use marketsim_core::AgentId;
use marketsim_market::MarketError;
use marketsim_ports::AgentError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error(transparent)]
    Market(#[from] MarketError),

    #[error("Agent {agent} failed: {source}")]
    Agent {
        agent: AgentId,
        #[source]
        source: AgentError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Agent {0} is already registered")]
    DuplicateAgent(AgentId),

    #[error("Agent {0} is not registered")]
    UnknownAgent(AgentId),

    #[error("Arrival rate must be positive, got {0}")]
    InvalidRate(f64),
}

pub type SimulationResult<T> = std::result::Result<T, SimulationError>;
