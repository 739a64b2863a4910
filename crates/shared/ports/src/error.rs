use marketsim_core::OrderId;
use thiserror::Error;

/// Errors raised by the order book
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookError {
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Order {0} is already resident in the book")]
    DuplicateIdentity(OrderId),

    #[error("Order {0} not found")]
    NotFound(OrderId),

    /// Corrupted book state. Never expected; callers must not continue.
    #[error("Book invariant violated: {0}")]
    InvariantViolation(String),
}

pub type BookResult<T> = std::result::Result<T, BookError>;

/// Errors raised by agent strategies
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    #[error("Strategy error: {0}")]
    Strategy(String),

    #[error("Invalid agent state: {0}")]
    InvalidState(String),
}

pub type AgentResult<T> = std::result::Result<T, AgentError>;
