use std::cmp::Ordering;

use marketsim_core::{Order, OrderId, Price, Quantity, Side};
use marketsim_ports::{BookError, BookResult};
use priority_queue::PriorityQueue;

/// Quantities at or below this are treated as exhausted
pub const QUANTITY_EPSILON: Quantity = 1e-9;

/// Heap key: price first (direction given by the order's side), then time
/// priority, then lower arrival sequence. Two resident keys are never equal
/// because the sequence is unique per order.
#[derive(Debug, Clone, Copy)]
struct Rank {
    order: Order,
    seq: u64,
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order
            .side
            .price_priority(self.order.price, other.order.price)
            .then_with(|| self.order.time_priority(&other.order))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Rank {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Rank {}

/// Price-time priority queue of orders for one side of the book
///
/// Orders are indexed by id so any resident order can be removed in
/// logarithmic time, not only the top one. The aggregate resident quantity is
/// maintained incrementally.
#[derive(Debug, Clone)]
pub struct OrderQueue {
    side: Side,
    heap: PriorityQueue<OrderId, Rank>,
    quantity: Quantity,
    next_seq: u64,
}

impl OrderQueue {
    /// Create an empty queue. Buy queues put the highest price on top, sell
    /// queues the lowest.
    pub fn new(side: Side) -> Self {
        Self {
            side,
            heap: PriorityQueue::new(),
            quantity: 0.0,
            next_seq: 0,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Insert an order behind every resident order with the same price and time
    pub fn add(&mut self, order: Order) -> BookResult<()> {
        let seq = self.next_seq;
        self.add_ranked(order, seq)
    }

    /// Insert with an explicit arrival sequence, used when an order moves
    /// between queues and must keep its original priority.
    pub(crate) fn add_ranked(&mut self, order: Order, seq: u64) -> BookResult<()> {
        if self.contains(order.order_id) {
            return Err(BookError::DuplicateIdentity(order.order_id));
        }
        if order.side != self.side {
            return Err(BookError::InvalidOrder(format!(
                "{} order {} cannot rest in a {} queue",
                order.side, order.order_id, self.side
            )));
        }
        if let Some(reason) = order.validation_error() {
            return Err(BookError::InvalidOrder(reason));
        }

        self.heap.push(order.order_id, Rank { order, seq });
        self.quantity += order.quantity;
        self.next_seq = self.next_seq.max(seq + 1);
        Ok(())
    }

    /// Add `order`'s quantity to the resident order with the same id, or
    /// insert it if there is none. The resident order keeps its rank.
    pub(crate) fn merge_ranked(&mut self, order: Order, seq: u64) -> BookResult<()> {
        match self.remove_ranked(order.order_id) {
            Some((resident, resident_seq)) => {
                let merged = resident.with_quantity(resident.quantity + order.quantity);
                self.add_ranked(merged, resident_seq.min(seq))
            }
            None => self.add_ranked(order, seq),
        }
    }

    /// Remove an order by id
    pub fn remove(&mut self, order_id: OrderId) -> BookResult<Order> {
        self.remove_ranked(order_id)
            .map(|(order, _)| order)
            .ok_or(BookError::NotFound(order_id))
    }

    pub(crate) fn remove_ranked(&mut self, order_id: OrderId) -> Option<(Order, u64)> {
        let (_, rank) = self.heap.remove(&order_id)?;
        self.release(rank.order.quantity);
        Some((rank.order, rank.seq))
    }

    /// Highest priority order, without removing it
    pub fn peek(&self) -> Option<&Order> {
        self.heap.peek().map(|(_, rank)| &rank.order)
    }

    /// Remove and return the highest priority order
    pub fn pop(&mut self) -> Option<Order> {
        self.pop_ranked().map(|(order, _)| order)
    }

    pub(crate) fn pop_ranked(&mut self) -> Option<(Order, u64)> {
        let (_, rank) = self.heap.pop()?;
        self.release(rank.order.quantity);
        Some((rank.order, rank.seq))
    }

    fn release(&mut self, quantity: Quantity) {
        if self.heap.is_empty() {
            // Drop accumulated rounding error
            self.quantity = 0.0;
        } else {
            self.quantity -= quantity;
        }
    }

    /// Price of the highest priority order
    pub fn best_price(&self) -> Option<Price> {
        self.peek().map(|order| order.price)
    }

    pub fn get(&self, order_id: OrderId) -> Option<&Order> {
        self.heap.get(&order_id).map(|(_, rank)| &rank.order)
    }

    pub fn contains(&self, order_id: OrderId) -> bool {
        self.heap.get(&order_id).is_some()
    }

    /// Aggregate resident quantity
    pub fn count(&self) -> Quantity {
        self.quantity
    }

    /// Number of resident orders
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.quantity = 0.0;
    }

    /// Copy of the resident orders, highest priority first
    pub fn orders(&self) -> Vec<Order> {
        let mut ranked: Vec<&Rank> = self.heap.iter().map(|(_, rank)| rank).collect();
        ranked.sort_by(|a, b| b.cmp(a));
        ranked.into_iter().map(|rank| rank.order).collect()
    }

    pub fn ids(&self) -> impl Iterator<Item = &OrderId> {
        self.heap.iter().map(|(id, _)| id)
    }
}
