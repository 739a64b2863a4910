//! End-to-end simulation tests
//!
//! Strategies are not part of the kernel, so the agents here are small
//! test-only implementations of the `Agent` port.

use std::cell::RefCell;
use std::rc::Rc;

use marketsim_core::{AgentId, MatchedOrder, Order, OrderId, Side, Timestamp};
use marketsim_market::{EventRecorder, FundamentalConfig, Market};
use marketsim_ports::{Agent, AgentError, AgentResult, MarketView};
use marketsim_runner::{AgentParams, SimulationConfig, SimulationError, Simulator};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Posts one shaded limit order around its private valuation per arrival and
/// withdraws the previous one first.
struct NoiseAgent {
    id: AgentId,
    seed: u64,
    params: AgentParams,
    rng: StdRng,
    next_seq: u32,
    resting: Option<OrderId>,
    position: f64,
    cash: f64,
    last_fundamental: f64,
}

impl NoiseAgent {
    fn new(id: AgentId, params: &AgentParams, seed: u64) -> Self {
        Self {
            id,
            seed,
            params: *params,
            rng: StdRng::seed_from_u64(seed),
            next_seq: 0,
            resting: None,
            position: 0.0,
            cash: 0.0,
            last_fundamental: 0.0,
        }
    }
}

impl Agent for NoiseAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn take_action(&mut self, view: &MarketView) -> AgentResult<Vec<Order>> {
        self.last_fundamental = view.fundamental;

        let side = if self.rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
        let q_max = self.params.q_max as f64;
        if (side == Side::Buy && self.position >= q_max)
            || (side == Side::Sell && self.position <= -q_max)
        {
            return Ok(Vec::new());
        }

        let private_value = self.rng.gen_range(-1.0..1.0) * self.params.pv_var.sqrt();
        let shade = self.rng.gen_range(self.params.shade[0]..self.params.shade[1]);
        let value = view.estimated_final_fundamental() + private_value;
        let price = match side {
            Side::Buy => value - shade,
            Side::Sell => value + shade,
        };

        let order_id = OrderId::compose(self.id, self.next_seq);
        self.next_seq += 1;
        self.resting = Some(order_id);
        Ok(vec![Order::new(order_id, side, price, 1.0, self.id, view.time)])
    }

    fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.next_seq = 0;
        self.resting = None;
        self.position = 0.0;
        self.cash = 0.0;
        self.last_fundamental = 0.0;
    }

    fn pos_value(&self) -> f64 {
        self.cash + self.position * self.last_fundamental
    }

    fn on_fill(&mut self, fill: &MatchedOrder) {
        self.position += fill.signed_quantity();
        self.cash += fill.cash_flow();
    }

    fn cancellations(&mut self) -> Vec<OrderId> {
        self.resting.take().into_iter().collect()
    }

    fn agent_type(&self) -> &'static str {
        "NoiseAgent"
    }
}

#[derive(Default)]
struct Journal {
    arrivals: Vec<(Timestamp, AgentId)>,
    fills: Vec<MatchedOrder>,
}

/// Replays fixed orders and cancellations, one entry per arrival
struct ScriptedAgent {
    id: AgentId,
    orders: Vec<Vec<Order>>,
    cancels: Vec<Vec<OrderId>>,
    arrival: usize,
    journal: Rc<RefCell<Journal>>,
}

impl ScriptedAgent {
    fn new(id: u64, journal: &Rc<RefCell<Journal>>) -> Self {
        Self {
            id: AgentId(id),
            orders: Vec::new(),
            cancels: Vec::new(),
            arrival: 0,
            journal: Rc::clone(journal),
        }
    }

    fn with_orders(mut self, orders: Vec<Vec<Order>>) -> Self {
        self.orders = orders;
        self
    }

    fn with_cancels(mut self, cancels: Vec<Vec<OrderId>>) -> Self {
        self.cancels = cancels;
        self
    }
}

impl Agent for ScriptedAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn take_action(&mut self, view: &MarketView) -> AgentResult<Vec<Order>> {
        self.journal.borrow_mut().arrivals.push((view.time, self.id));
        let orders = self
            .orders
            .get(self.arrival)
            .map(|orders| {
                orders
                    .iter()
                    .map(|order| Order { time: view.time, ..*order })
                    .collect()
            })
            .unwrap_or_default();
        self.arrival += 1;
        Ok(orders)
    }

    fn reset(&mut self) {
        self.arrival = 0;
    }

    fn pos_value(&self) -> f64 {
        0.0
    }

    fn on_fill(&mut self, fill: &MatchedOrder) {
        self.journal.borrow_mut().fills.push(*fill);
    }

    fn cancellations(&mut self) -> Vec<OrderId> {
        self.cancels.get(self.arrival).cloned().unwrap_or_default()
    }
}

struct FailingAgent(AgentId);

impl Agent for FailingAgent {
    fn id(&self) -> AgentId {
        self.0
    }

    fn take_action(&mut self, _view: &MarketView) -> AgentResult<Vec<Order>> {
        Err(AgentError::Strategy("no valuation available".to_string()))
    }

    fn reset(&mut self) {}

    fn pos_value(&self) -> f64 {
        0.0
    }
}

fn noise_factory(id: AgentId, params: &AgentParams, seed: u64) -> Box<dyn Agent> {
    Box::new(NoiseAgent::new(id, params, seed))
}

fn busy_config(seed: u64) -> SimulationConfig {
    SimulationConfig {
        num_background_agents: 10,
        sim_time: 1000,
        arrival_rate: 0.05,
        ..Default::default()
    }
    .with_seed(seed)
}

fn quiet_market() -> Market {
    let config = FundamentalConfig {
        mean: 100.0,
        reversion_rate: 0.1,
        shock_variance: 0.0,
    };
    Market::new(config, 0).unwrap()
}

/// Every agent arrives on every tick
const EVERY_TICK: f64 = 1e9;

fn run_recorded(config: &SimulationConfig) -> (Vec<marketsim_market::MarketEvent>, String) {
    let mut simulator = Simulator::from_config(config, noise_factory).unwrap();
    let recorder = EventRecorder::new();
    simulator.market_mut().add_observer(Box::new(recorder.clone()));
    let results = simulator.run().unwrap();
    (recorder.events(), results.summary())
}

#[test]
fn test_simulation_runs() {
    let _ = env_logger::try_init();
    let config = busy_config(1);
    let mut simulator = Simulator::from_config(&config, noise_factory).unwrap();
    assert_eq!(simulator.agent_ids().len(), 10);

    let results = simulator.run().unwrap();

    assert!(results.events > 0);
    assert!(results.steps <= results.events);
    assert!(results.orders_submitted > 0);
    assert!(results.trades > 0);
    assert_eq!(results.orders_rejected, 0);
    assert_eq!(results.final_time, 1000);
    assert_eq!(simulator.market().time(), 1000);
    assert_eq!(simulator.market().fundamental_history().len(), 1001);
    simulator.market().book().check_invariants().unwrap();

    let values = simulator.agent_values();
    assert_eq!(values.len(), 10);
    assert!(values.iter().all(|(_, value)| value.is_finite()));
}

#[test]
fn test_same_seed_same_trace() {
    let (events_a, summary_a) = run_recorded(&busy_config(7));
    let (events_b, summary_b) = run_recorded(&busy_config(7));

    assert!(!events_a.is_empty());
    assert_eq!(events_a, events_b);
    assert_eq!(summary_a, summary_b);

    let (events_c, _) = run_recorded(&busy_config(8));
    assert_ne!(events_a, events_c);
}

#[test]
fn test_rerun_replays_trace() {
    let mut simulator = Simulator::from_config(&busy_config(3), noise_factory).unwrap();
    let recorder = EventRecorder::new();
    simulator.market_mut().add_observer(Box::new(recorder.clone()));

    let first = simulator.run().unwrap();
    let first_events = recorder.events();
    recorder.clear();

    let second = simulator.run().unwrap();
    assert_eq!(first, second);
    assert_eq!(first_events, recorder.events());
}

#[test]
fn test_agent_error_is_fatal() {
    let mut simulator = Simulator::new(quiet_market(), 100, 0.5, 1).unwrap();
    simulator.add_agent(Box::new(FailingAgent(AgentId(4)))).unwrap();

    let err = simulator.run().unwrap_err();
    assert_eq!(
        err,
        SimulationError::Agent {
            agent: AgentId(4),
            source: AgentError::Strategy("no valuation available".to_string()),
        }
    );
}

#[test]
fn test_duplicate_agent_rejected() {
    let journal = Rc::new(RefCell::new(Journal::default()));
    let mut simulator = Simulator::new(quiet_market(), 100, 0.5, 1).unwrap();
    simulator
        .add_agent(Box::new(ScriptedAgent::new(1, &journal)))
        .unwrap();

    let err = simulator
        .add_agent_with_rate(Box::new(ScriptedAgent::new(1, &journal)), 2.0)
        .unwrap_err();
    assert_eq!(err, SimulationError::DuplicateAgent(AgentId(1)));

    assert!(matches!(
        simulator.add_agent_with_rate(Box::new(ScriptedAgent::new(2, &journal)), 0.0),
        Err(SimulationError::InvalidRate(_))
    ));
}

#[test]
fn test_invalid_config_rejected() {
    let config = SimulationConfig {
        arrival_rate: -1.0,
        ..Default::default()
    };
    assert!(matches!(
        Simulator::from_config(&config, noise_factory),
        Err(SimulationError::Config(_))
    ));
}

#[test]
fn test_fills_routed_to_owners() {
    let journal = Rc::new(RefCell::new(Journal::default()));
    let seller = ScriptedAgent::new(1, &journal).with_orders(vec![vec![Order::sell(
        OrderId::compose(AgentId(1), 0),
        100.0,
        5.0,
        AgentId(1),
        0,
    )]]);
    let buyer = ScriptedAgent::new(2, &journal).with_orders(vec![vec![Order::buy(
        OrderId::compose(AgentId(2), 0),
        101.0,
        5.0,
        AgentId(2),
        0,
    )]]);

    let mut simulator = Simulator::new(quiet_market(), 10, 0.5, 9).unwrap();
    simulator.add_agent_with_rate(Box::new(seller), EVERY_TICK).unwrap();
    simulator.add_agent_with_rate(Box::new(buyer), EVERY_TICK).unwrap();

    let results = simulator.run().unwrap();
    assert_eq!(results.trades, 1);
    assert_eq!(results.volume, 5.0);

    let fills = journal.borrow().fills.clone();
    assert_eq!(fills.len(), 2);
    let owners: Vec<AgentId> = fills.iter().map(|fill| fill.order.agent_id).collect();
    assert_eq!(owners, vec![AgentId(2), AgentId(1)]);
    // Seller rested first
    assert!(fills.iter().all(|fill| fill.price == 100.0));
    // Both arrive on the first tick
    assert!(fills.iter().all(|fill| fill.time == 1));
}

#[test]
fn test_same_instant_agents_act_in_id_order() {
    let journal = Rc::new(RefCell::new(Journal::default()));
    let mut simulator = Simulator::new(quiet_market(), 20, 0.5, 2).unwrap();
    for id in [3, 1, 2] {
        simulator
            .add_agent_with_rate(Box::new(ScriptedAgent::new(id, &journal)), EVERY_TICK)
            .unwrap();
    }

    let results = simulator.run().unwrap();
    assert_eq!(results.steps, 19);
    assert_eq!(results.events, 57);

    let arrivals = journal.borrow().arrivals.clone();
    let mut expected = Vec::new();
    for time in 1..20 {
        for id in 1..=3 {
            expected.push((time, AgentId(id)));
        }
    }
    assert_eq!(arrivals, expected);
}

#[test]
fn test_no_arrival_at_or_after_horizon() {
    let journal = Rc::new(RefCell::new(Journal::default()));
    let mut simulator = Simulator::new(quiet_market(), 500, 0.05, 11).unwrap();
    for id in 0..5 {
        simulator
            .add_agent(Box::new(ScriptedAgent::new(id, &journal)))
            .unwrap();
    }

    let results = simulator.run().unwrap();
    let arrivals = journal.borrow().arrivals.clone();
    assert_eq!(arrivals.len() as u64, results.events);
    assert!(arrivals.iter().all(|(time, _)| *time > 0 && *time < 500));
    assert!(arrivals.windows(2).all(|pair| pair[0].0 <= pair[1].0));
    assert_eq!(results.final_time, 500);
}

#[test]
fn test_cancellations_and_rejections() {
    let journal = Rc::new(RefCell::new(Journal::default()));
    let resting = OrderId::compose(AgentId(1), 0);
    let agent = ScriptedAgent::new(1, &journal)
        .with_orders(vec![
            vec![
                Order::buy(resting, 99.0, 2.0, AgentId(1), 0),
                // Duplicate of the order just placed
                Order::buy(resting, 98.0, 1.0, AgentId(1), 0),
                Order::buy(OrderId::compose(AgentId(1), 1), 98.0, 0.0, AgentId(1), 0),
            ],
            vec![],
        ])
        .with_cancels(vec![
            vec![],
            // Second cancel of the same id is no longer resident and ignored
            vec![resting, resting, OrderId(12345)],
        ]);

    let mut simulator = Simulator::new(quiet_market(), 5, 0.5, 4).unwrap();
    simulator.add_agent_with_rate(Box::new(agent), EVERY_TICK).unwrap();

    let results = simulator.run().unwrap();
    assert_eq!(results.orders_submitted, 3);
    assert_eq!(results.orders_rejected, 2);
    assert_eq!(results.cancellations, 1);
    assert!(simulator.market().book().is_empty());
}

#[test]
fn test_resting_orders_survive_horizon() {
    let journal = Rc::new(RefCell::new(Journal::default()));
    let agent = ScriptedAgent::new(1, &journal).with_orders(vec![vec![Order::sell(
        OrderId(1),
        120.0,
        3.0,
        AgentId(1),
        0,
    )]]);

    let mut simulator = Simulator::new(quiet_market(), 5, 0.5, 4).unwrap();
    simulator.add_agent_with_rate(Box::new(agent), EVERY_TICK).unwrap();
    simulator.run().unwrap();

    assert_eq!(simulator.market().best_ask(), Some(120.0));
    assert_eq!(simulator.agent(AgentId(1)).map(|agent| agent.pos_value()), Some(0.0));
}

#[test]
fn test_vanishing_rate_agent_never_arrives() {
    let journal = Rc::new(RefCell::new(Journal::default()));
    let mut simulator = Simulator::new(quiet_market(), 10, 0.5, 6).unwrap();
    simulator
        .add_agent_with_rate(Box::new(ScriptedAgent::new(1, &journal)), 1e-310)
        .unwrap();
    simulator
        .add_agent_with_rate(Box::new(ScriptedAgent::new(2, &journal)), EVERY_TICK)
        .unwrap();

    let results = simulator.run().unwrap();
    assert_eq!(results.final_time, 10);

    let arrivals = journal.borrow().arrivals.clone();
    assert_eq!(arrivals.len(), 9);
    assert!(arrivals.iter().all(|(_, id)| *id == AgentId(2)));
}
