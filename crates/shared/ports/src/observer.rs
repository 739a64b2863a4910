use marketsim_core::{MatchedOrder, Price, Quantity, Timestamp};
use serde::{Deserialize, Serialize};

/// Best unmatched bid and ask with the size of the order at each
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TopOfBook {
    pub best_bid: Option<Price>,
    pub bid_size: Quantity,
    pub best_ask: Option<Price>,
    pub ask_size: Quantity,
    pub time: Timestamp,
}

impl TopOfBook {
    /// Same quotes, ignoring the timestamp
    pub fn same_quotes(&self, other: &TopOfBook) -> bool {
        self.best_bid == other.best_bid
            && self.bid_size == other.bid_size
            && self.best_ask == other.best_ask
            && self.ask_size == other.ask_size
    }
}

/// Port for market observers (event hubs, recorders, metrics)
pub trait MarketObserver {
    /// Invoked once per fill leg
    fn on_trade(&mut self, fill: &MatchedOrder);

    /// Invoked when the top of book may have changed
    fn on_top_of_book(&mut self, top: &TopOfBook);
}
