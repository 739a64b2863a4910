use log::debug;
use marketsim_core::{MatchedOrder, Order, OrderId, Price, Side, Timestamp};
use marketsim_matching::FourHeap;
use marketsim_ports::{BookError, MarketObserver, MarketView, TopOfBook};

use crate::error::MarketResult;
use crate::fundamental::{FundamentalConfig, FundamentalProcess};

/// A single-asset market: the book, the clock and the fundamental value
///
/// The market exclusively owns its book. Agents reach it only through
/// `submit_order` and `cancel_order`.
pub struct Market {
    book: FourHeap,
    time: Timestamp,
    fundamental: FundamentalProcess,
    observers: Vec<Box<dyn MarketObserver>>,
    last_top: TopOfBook,
}

impl Market {
    pub fn new(config: FundamentalConfig, seed: u64) -> MarketResult<Self> {
        Ok(Self {
            book: FourHeap::new(),
            time: 0,
            fundamental: FundamentalProcess::new(config, seed)?,
            observers: Vec::new(),
            last_top: TopOfBook::default(),
        })
    }

    pub fn add_observer(&mut self, observer: Box<dyn MarketObserver>) {
        self.observers.push(observer);
    }

    /// Insert an order into the book.
    ///
    /// Observers see every fill leg, then the top of book if it changed.
    /// Orders dated after the market clock are rejected.
    pub fn submit_order(&mut self, order: Order) -> MarketResult<Vec<MatchedOrder>> {
        if order.time > self.time {
            return Err(BookError::InvalidOrder(format!(
                "order {} is dated t={} after market time t={}",
                order.order_id, order.time, self.time
            ))
            .into());
        }
        let fills = self.book.insert(order, self.time)?;
        self.publish(&fills);
        Ok(fills)
    }

    /// Withdraw every resident portion of an order. Any fills caused by
    /// demoted liquidity re-crossing the book are published and returned.
    pub fn cancel_order(&mut self, order_id: OrderId) -> MarketResult<Vec<MatchedOrder>> {
        let fills = self.book.withdraw(order_id, self.time)?;
        debug!("Cancelled {} at t={}", order_id, self.time);
        self.publish(&fills);
        Ok(fills)
    }

    fn publish(&mut self, fills: &[MatchedOrder]) {
        for fill in fills {
            for observer in &mut self.observers {
                observer.on_trade(fill);
            }
        }

        let top = self.top_of_book();
        if !top.same_quotes(&self.last_top) {
            for observer in &mut self.observers {
                observer.on_top_of_book(&top);
            }
            self.last_top = top;
        }
    }

    /// Move the clock forward, stepping the fundamental once per tick
    pub fn advance_time(&mut self, delta: Timestamp) {
        for _ in 0..delta {
            self.fundamental.step();
        }
        self.time += delta;
    }

    /// Move the clock forward to `time`. Earlier times are ignored.
    pub fn advance_to(&mut self, time: Timestamp) {
        if time > self.time {
            self.advance_time(time - self.time);
        }
    }

    pub fn time(&self) -> Timestamp {
        self.time
    }

    /// Current fundamental value
    pub fn fundamental(&self) -> Price {
        self.fundamental.value()
    }

    /// Fundamental value used for settlement. Reads the current value; the
    /// engine itself never settles.
    pub fn get_final_fundamental(&self) -> Price {
        self.fundamental.value()
    }

    /// Fundamental value at every time step so far, indexed by time
    pub fn fundamental_history(&self) -> &[Price] {
        self.fundamental.history()
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.book.best_bid()
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.book.best_ask()
    }

    pub fn top_of_book(&self) -> TopOfBook {
        TopOfBook {
            best_bid: self.book.best_bid(),
            bid_size: self.book.best_bid_order().map_or(0.0, |o| o.quantity),
            best_ask: self.book.best_ask(),
            ask_size: self.book.best_ask_order().map_or(0.0, |o| o.quantity),
            time: self.time,
        }
    }

    /// Snapshot handed to agents when they arrive
    pub fn view(&self, sim_time: Timestamp) -> MarketView {
        let config = self.fundamental.config();
        MarketView {
            time: self.time,
            sim_time,
            best_bid: self.book.best_bid(),
            best_ask: self.book.best_ask(),
            fundamental: self.fundamental.value(),
            mean: config.mean,
            reversion_rate: config.reversion_rate,
        }
    }

    pub fn book(&self) -> &FourHeap {
        &self.book
    }

    /// Remove matched orders from the book for settlement
    pub fn settle_matched(&mut self) -> Vec<Order> {
        let settled = self.book.clear_matched();
        debug!(
            "Settled {} buy and {} sell records at t={}",
            settled.iter().filter(|o| o.side == Side::Buy).count(),
            settled.iter().filter(|o| o.side == Side::Sell).count(),
            self.time
        );
        settled
    }

    /// Empty the book, rewind the clock and the fundamental. Observers stay
    /// attached.
    pub fn reset(&mut self) {
        self.book.clear();
        self.time = 0;
        self.fundamental.reset();
        self.last_top = TopOfBook::default();
    }
}
