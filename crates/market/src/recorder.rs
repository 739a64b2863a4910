use std::cell::RefCell;
use std::rc::Rc;

use marketsim_core::MatchedOrder;
use marketsim_ports::{MarketObserver, TopOfBook};
use serde::{Deserialize, Serialize};

/// Event raised by a market towards its observers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MarketEvent {
    Trade(MatchedOrder),
    TopOfBook(TopOfBook),
}

/// Observer that appends every market event to a log
///
/// Clones share the same log, so one handle can be given to the market while
/// another is kept to read the events back.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Rc<RefCell<Vec<MarketEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events recorded so far
    pub fn events(&self) -> Vec<MarketEvent> {
        self.events.borrow().clone()
    }

    pub fn trades(&self) -> Vec<MatchedOrder> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                MarketEvent::Trade(fill) => Some(*fill),
                MarketEvent::TopOfBook(_) => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl MarketObserver for EventRecorder {
    fn on_trade(&mut self, fill: &MatchedOrder) {
        self.events.borrow_mut().push(MarketEvent::Trade(*fill));
    }

    fn on_top_of_book(&mut self, top: &TopOfBook) {
        self.events.borrow_mut().push(MarketEvent::TopOfBook(*top));
    }
}
