//! Marketsim Matching Engine
//!
//! Continuous double-auction matching built on the four-heap book:
//! two priority queues per side, one for orders currently paired against the
//! other side (matched) and one for resting liquidity (unmatched).
//!
//! Keeping matched quantity in its own queues is what makes withdrawal cheap:
//! releasing a matched order only pops the opposite matched queue and pushes
//! the freed quantity back into the opposite unmatched queue.

mod four_heap;
mod order_queue;

pub use four_heap::{BookSnapshot, FourHeap};
pub use order_queue::{OrderQueue, QUANTITY_EPSILON};

// Re-export the error types from ports for convenience
pub use marketsim_ports::{BookError, BookResult};
