mod matched_order;
mod order;
mod side;

pub use matched_order::MatchedOrder;
pub use order::Order;
pub use side::Side;
