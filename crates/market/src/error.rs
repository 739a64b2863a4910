use marketsim_ports::BookError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    #[error(transparent)]
    Book(#[from] BookError),

    #[error("Invalid market configuration: {0}")]
    InvalidConfig(String),
}

pub type MarketResult<T> = std::result::Result<T, MarketError>;
