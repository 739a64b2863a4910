use log::{debug, trace};
use marketsim_core::{MatchedOrder, Order, OrderId, Price, Quantity, Side, Timestamp};
use marketsim_ports::{BookError, BookResult};

use crate::order_queue::{OrderQueue, QUANTITY_EPSILON};

/// Resident orders of all four queues, each highest priority first
#[derive(Debug, Clone, PartialEq)]
pub struct BookSnapshot {
    pub buy_unmatched: Vec<Order>,
    pub buy_matched: Vec<Order>,
    pub sell_unmatched: Vec<Order>,
    pub sell_matched: Vec<Order>,
}

/// Continuous double-auction book split into matched and unmatched queues
/// per side.
///
/// An order id may be split between the matched and the unmatched queue of
/// its own side after a partial fill, but never appears on both sides.
#[derive(Debug, Clone)]
pub struct FourHeap {
    buy_unmatched: OrderQueue,
    buy_matched: OrderQueue,
    sell_unmatched: OrderQueue,
    sell_matched: OrderQueue,
    arrivals: u64,
}

impl Default for FourHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl FourHeap {
    pub fn new() -> Self {
        Self {
            buy_unmatched: OrderQueue::new(Side::Buy),
            buy_matched: OrderQueue::new(Side::Buy),
            sell_unmatched: OrderQueue::new(Side::Sell),
            sell_matched: OrderQueue::new(Side::Sell),
            arrivals: 0,
        }
    }

    /// Insert an order and match it against the opposite unmatched queue.
    ///
    /// Returns the fills in execution order, buy leg before sell leg for each
    /// fill, stamped with the trade time `now`. A rejected order leaves the
    /// book untouched.
    pub fn insert(&mut self, order: Order, now: Timestamp) -> BookResult<Vec<MatchedOrder>> {
        if let Some(reason) = order.validation_error() {
            return Err(BookError::InvalidOrder(reason));
        }
        if self.contains(order.order_id) {
            return Err(BookError::DuplicateIdentity(order.order_id));
        }

        let seq = self.arrivals;
        self.arrivals += 1;
        self.unmatched_mut(order.side).add_ranked(order, seq)?;

        let fills = self.match_unmatched(now)?;
        debug_assert!(self.is_uncrossed());
        Ok(fills)
    }

    /// Remove every resident portion of an order.
    ///
    /// Withdrawing a matched portion demotes the same quantity from the
    /// opposite matched queue back to its unmatched queue. Demoted orders may
    /// cross resting liquidity, so a matching pass follows and its fills,
    /// stamped with `now`, are returned.
    pub fn withdraw(
        &mut self,
        order_id: OrderId,
        now: Timestamp,
    ) -> BookResult<Vec<MatchedOrder>> {
        let Some(side) = self.side_of(order_id) else {
            return Err(BookError::NotFound(order_id));
        };

        if let Some((order, _)) = self.unmatched_mut(side).remove_ranked(order_id) {
            debug!("Withdrew {} unmatched of {}", order.quantity, order_id);
        }

        let Some((matched, _)) = self.matched_mut(side).remove_ranked(order_id) else {
            return Ok(Vec::new());
        };
        debug!("Withdrew {} matched of {}", matched.quantity, order_id);

        self.demote(side.opposite(), matched.quantity)?;
        let fills = self.match_unmatched(now)?;
        debug_assert!(self.is_balanced());
        Ok(fills)
    }

    /// Move `quantity` from the matched queue of `side` to its unmatched
    /// queue, highest priority first.
    fn demote(&mut self, side: Side, mut quantity: Quantity) -> BookResult<()> {
        while quantity > QUANTITY_EPSILON {
            let Some((order, seq)) = self.matched_mut(side).pop_ranked() else {
                return Err(BookError::InvariantViolation(format!(
                    "{} matched queue exhausted with {} left to demote",
                    side, quantity
                )));
            };

            let released = order.quantity.min(quantity);
            let kept = order.quantity - released;
            quantity -= released;

            trace!("Demoting {} of {} to {} unmatched", released, order.order_id, side);
            self.unmatched_mut(side)
                .merge_ranked(order.with_quantity(released), seq)?;
            if kept > QUANTITY_EPSILON {
                self.matched_mut(side).add_ranked(order.with_quantity(kept), seq)?;
            }
        }
        Ok(())
    }

    /// Pair the best unmatched bid and ask while they cross.
    fn match_unmatched(&mut self, now: Timestamp) -> BookResult<Vec<MatchedOrder>> {
        let mut fills = Vec::new();

        while self.is_crossed() {
            let (Some((buy, buy_seq)), Some((sell, sell_seq))) = (
                self.buy_unmatched.pop_ranked(),
                self.sell_unmatched.pop_ranked(),
            ) else {
                break;
            };

            let quantity = buy.quantity.min(sell.quantity);
            // Earlier arrival is the resting side and sets the price
            let price = if buy_seq < sell_seq { buy.price } else { sell.price };

            self.promote(buy, buy_seq, quantity)?;
            self.promote(sell, sell_seq, quantity)?;

            debug!(
                "Matched {} @ {}: buy {} sell {}",
                quantity, price, buy.order_id, sell.order_id
            );
            fills.push(MatchedOrder::new(buy.with_quantity(quantity), price, now));
            fills.push(MatchedOrder::new(sell.with_quantity(quantity), price, now));
        }

        Ok(fills)
    }

    /// Move `quantity` of a popped unmatched order into its matched queue and
    /// put any remainder back with its original priority.
    fn promote(&mut self, order: Order, seq: u64, quantity: Quantity) -> BookResult<()> {
        trace!("Promoting {} of {} to matched", quantity, order.order_id);
        self.matched_mut(order.side)
            .merge_ranked(order.with_quantity(quantity), seq)?;

        let leftover = order.quantity - quantity;
        if leftover > QUANTITY_EPSILON {
            self.unmatched_mut(order.side)
                .add_ranked(order.with_quantity(leftover), seq)?;
        }
        Ok(())
    }

    fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Side::Buy.crosses(bid, ask),
            _ => false,
        }
    }

    fn is_uncrossed(&self) -> bool {
        !self.is_crossed()
    }

    fn is_balanced(&self) -> bool {
        (self.buy_matched.count() - self.sell_matched.count()).abs() <= tolerance(self)
    }

    fn side_of(&self, order_id: OrderId) -> Option<Side> {
        if self.buy_unmatched.contains(order_id) || self.buy_matched.contains(order_id) {
            Some(Side::Buy)
        } else if self.sell_unmatched.contains(order_id) || self.sell_matched.contains(order_id) {
            Some(Side::Sell)
        } else {
            None
        }
    }

    fn unmatched_mut(&mut self, side: Side) -> &mut OrderQueue {
        match side {
            Side::Buy => &mut self.buy_unmatched,
            Side::Sell => &mut self.sell_unmatched,
        }
    }

    fn matched_mut(&mut self, side: Side) -> &mut OrderQueue {
        match side {
            Side::Buy => &mut self.buy_matched,
            Side::Sell => &mut self.sell_matched,
        }
    }

    /// Highest unmatched buy price, if any
    pub fn best_bid(&self) -> Option<Price> {
        self.buy_unmatched.best_price()
    }

    /// Lowest unmatched sell price, if any
    pub fn best_ask(&self) -> Option<Price> {
        self.sell_unmatched.best_price()
    }

    pub fn best_bid_order(&self) -> Option<&Order> {
        self.buy_unmatched.peek()
    }

    pub fn best_ask_order(&self) -> Option<&Order> {
        self.sell_unmatched.peek()
    }

    /// Quantity currently paired across the book. Equal on both sides.
    pub fn total_matched_quantity(&self) -> Quantity {
        self.buy_matched.count()
    }

    pub fn matched_quantity(&self, side: Side) -> Quantity {
        self.matched(side).count()
    }

    pub fn unmatched_quantity(&self, side: Side) -> Quantity {
        self.unmatched(side).count()
    }

    pub fn unmatched(&self, side: Side) -> &OrderQueue {
        match side {
            Side::Buy => &self.buy_unmatched,
            Side::Sell => &self.sell_unmatched,
        }
    }

    pub fn matched(&self, side: Side) -> &OrderQueue {
        match side {
            Side::Buy => &self.buy_matched,
            Side::Sell => &self.sell_matched,
        }
    }

    /// Whether any portion of the order is resident
    pub fn contains(&self, order_id: OrderId) -> bool {
        self.side_of(order_id).is_some()
    }

    /// Number of resident order records across all four queues
    pub fn len(&self) -> usize {
        self.buy_unmatched.len()
            + self.buy_matched.len()
            + self.sell_unmatched.len()
            + self.sell_matched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            buy_unmatched: self.buy_unmatched.orders(),
            buy_matched: self.buy_matched.orders(),
            sell_unmatched: self.sell_unmatched.orders(),
            sell_matched: self.sell_matched.orders(),
        }
    }

    /// Verify conservation, the uncrossed book and side exclusivity.
    pub fn check_invariants(&self) -> BookResult<()> {
        if !self.is_balanced() {
            return Err(BookError::InvariantViolation(format!(
                "matched quantity mismatch: buy {} sell {}",
                self.buy_matched.count(),
                self.sell_matched.count()
            )));
        }

        if let (Some(bid), Some(ask)) = (self.best_bid(), self.best_ask()) {
            if bid >= ask {
                return Err(BookError::InvariantViolation(format!(
                    "crossed unmatched book: bid {} ask {}",
                    bid, ask
                )));
            }
        }

        for id in self.buy_unmatched.ids().chain(self.buy_matched.ids()) {
            if self.sell_unmatched.contains(*id) || self.sell_matched.contains(*id) {
                return Err(BookError::InvariantViolation(format!(
                    "order {} resident on both sides",
                    id
                )));
            }
        }

        Ok(())
    }

    /// Drain both matched queues, leaving unmatched liquidity in place.
    /// Returns the drained orders, buys first.
    pub fn clear_matched(&mut self) -> Vec<Order> {
        let mut drained = self.buy_matched.orders();
        drained.extend(self.sell_matched.orders());
        self.buy_matched.clear();
        self.sell_matched.clear();
        drained
    }

    pub fn clear(&mut self) {
        self.buy_unmatched.clear();
        self.buy_matched.clear();
        self.sell_unmatched.clear();
        self.sell_matched.clear();
        self.arrivals = 0;
    }
}

fn tolerance(book: &FourHeap) -> Quantity {
    QUANTITY_EPSILON * (1.0 + book.buy_matched.len().max(book.sell_matched.len()) as f64)
}
