//! Sampled-arrival event loop
//!
//! Each agent arrives according to its own Poisson process. The loop jumps
//! from one arrival instant to the next, advances the market clock, lets every
//! agent scheduled for that instant act in agent id order, and stops at the
//! horizon. Resting orders are left in the book for external settlement.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use log::{debug, info, warn};
use marketsim_core::{AgentId, MatchedOrder, Price, Timestamp};
use marketsim_market::{Market, MarketError};
use marketsim_ports::{Agent, BookError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::arrival::ArrivalProcess;
use crate::config::{AgentParams, SimulationConfig};
use crate::error::{SimulationError, SimulationResult};

/// Counters collected over one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationResults {
    /// Distinct arrival instants processed
    pub steps: u64,
    /// Agent arrivals processed
    pub events: u64,
    pub orders_submitted: u64,
    /// Orders refused by the book (invalid or duplicate)
    pub orders_rejected: u64,
    pub cancellations: u64,
    /// Fills, counting each buy/sell pair once
    pub trades: u64,
    /// Quantity traded, one side counted
    pub volume: f64,
    pub final_time: Timestamp,
    pub final_fundamental: Price,
}

impl SimulationResults {
    pub fn summary(&self) -> String {
        format!(
            "t={} steps={} arrivals={} orders={} rejected={} cancels={} trades={} volume={} fundamental={:.2}",
            self.final_time,
            self.steps,
            self.events,
            self.orders_submitted,
            self.orders_rejected,
            self.cancellations,
            self.trades,
            self.volume,
            self.final_fundamental
        )
    }
}

struct AgentSlot {
    agent: Box<dyn Agent>,
    arrivals: ArrivalProcess,
}

/// Drives a population of agents against one market until the horizon
pub struct Simulator {
    market: Market,
    sim_time: Timestamp,
    agents: BTreeMap<AgentId, AgentSlot>,
    default_arrivals: ArrivalProcess,
    arrival_seed: u64,
    rng: StdRng,
    /// Next arrival per agent, earliest first, then lowest agent id
    schedule: BinaryHeap<Reverse<(Timestamp, AgentId)>>,
}

impl Simulator {
    pub fn new(
        market: Market,
        sim_time: Timestamp,
        arrival_rate: f64,
        arrival_seed: u64,
    ) -> SimulationResult<Self> {
        Ok(Self {
            market,
            sim_time,
            agents: BTreeMap::new(),
            default_arrivals: ArrivalProcess::new(arrival_rate)?,
            arrival_seed,
            rng: StdRng::seed_from_u64(arrival_seed),
            schedule: BinaryHeap::new(),
        })
    }

    /// Build the market and `num_background_agents` agents from a config.
    ///
    /// The master seed derives the fundamental seed, the arrival seed and one
    /// seed per agent, handed to `factory` with the agent's id and parameters.
    pub fn from_config<F>(config: &SimulationConfig, mut factory: F) -> SimulationResult<Self>
    where
        F: FnMut(AgentId, &AgentParams, u64) -> Box<dyn Agent>,
    {
        config.validate()?;

        let mut seeds = StdRng::seed_from_u64(config.seed.unwrap_or(0));
        let market = Market::new(config.fundamental, seeds.r#gen())?;
        let mut simulator =
            Self::new(market, config.sim_time, config.arrival_rate, seeds.r#gen())?;

        for n in 0..config.num_background_agents {
            let agent = factory(AgentId(n as u64), &config.agent, seeds.r#gen());
            simulator.add_agent(agent)?;
        }
        Ok(simulator)
    }

    /// Register an agent with the default arrival rate
    pub fn add_agent(&mut self, agent: Box<dyn Agent>) -> SimulationResult<()> {
        let arrivals = self.default_arrivals;
        self.insert_agent(agent, arrivals)
    }

    pub fn add_agent_with_rate(&mut self, agent: Box<dyn Agent>, rate: f64) -> SimulationResult<()> {
        let arrivals = ArrivalProcess::new(rate)?;
        self.insert_agent(agent, arrivals)
    }

    fn insert_agent(&mut self, agent: Box<dyn Agent>, arrivals: ArrivalProcess) -> SimulationResult<()> {
        let id = agent.id();
        if self.agents.contains_key(&id) {
            return Err(SimulationError::DuplicateAgent(id));
        }
        debug!("Registered {} {} at rate {}", agent.agent_type(), id, arrivals.rate());
        self.agents.insert(id, AgentSlot { agent, arrivals });
        Ok(())
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    pub fn market_mut(&mut self) -> &mut Market {
        &mut self.market
    }

    pub fn sim_time(&self) -> Timestamp {
        self.sim_time
    }

    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    pub fn agent(&self, id: AgentId) -> Option<&dyn Agent> {
        self.agents.get(&id).map(|slot| slot.agent.as_ref())
    }

    /// Position value of every agent, by id
    pub fn agent_values(&self) -> Vec<(AgentId, f64)> {
        self.agents
            .iter()
            .map(|(id, slot)| (*id, slot.agent.pos_value()))
            .collect()
    }

    /// Run from time 0 to the horizon.
    ///
    /// Agents, the market and the arrival generator are reset first, so
    /// repeated runs replay the same trace. An agent error ends the run.
    pub fn run(&mut self) -> SimulationResult<SimulationResults> {
        info!(
            "Starting simulation: {} agents, horizon {}",
            self.agents.len(),
            self.sim_time
        );

        self.market.reset();
        self.rng = StdRng::seed_from_u64(self.arrival_seed);
        self.schedule.clear();
        for (id, slot) in self.agents.iter_mut() {
            slot.agent.reset();
            let first = slot.arrivals.next_arrival(0, &mut self.rng);
            self.schedule.push(Reverse((first, *id)));
        }

        let mut results = SimulationResults::default();

        while let Some(&Reverse((time, _))) = self.schedule.peek() {
            if time >= self.sim_time {
                break;
            }
            self.market.advance_to(time);
            results.steps += 1;

            let mut arriving = Vec::new();
            while let Some(&Reverse((next, id))) = self.schedule.peek() {
                if next != time {
                    break;
                }
                self.schedule.pop();
                arriving.push(id);
            }

            for agent_id in arriving {
                self.process_arrival(agent_id, &mut results)?;

                let slot = self
                    .agents
                    .get(&agent_id)
                    .ok_or(SimulationError::UnknownAgent(agent_id))?;
                let next = slot.arrivals.next_arrival(time, &mut self.rng);
                self.schedule.push(Reverse((next, agent_id)));
            }
        }

        self.market.advance_to(self.sim_time);
        results.final_time = self.market.time();
        results.final_fundamental = self.market.get_final_fundamental();

        info!("Simulation finished: {}", results.summary());
        Ok(results)
    }

    /// Withdraw the agent's cancellations, then submit its new orders
    fn process_arrival(
        &mut self,
        agent_id: AgentId,
        results: &mut SimulationResults,
    ) -> SimulationResult<()> {
        let slot = self
            .agents
            .get_mut(&agent_id)
            .ok_or(SimulationError::UnknownAgent(agent_id))?;
        results.events += 1;

        let mut fills: Vec<MatchedOrder> = Vec::new();

        for order_id in slot.agent.cancellations() {
            match self.market.cancel_order(order_id) {
                Ok(demoted) => {
                    results.cancellations += 1;
                    fills.extend(demoted);
                }
                Err(MarketError::Book(BookError::NotFound(_))) => {
                    debug!("{} cancelled {} which is no longer resident", agent_id, order_id);
                }
                Err(e) => return Err(e.into()),
            }
        }

        let view = self.market.view(self.sim_time);
        let orders = slot
            .agent
            .take_action(&view)
            .map_err(|source| SimulationError::Agent {
                agent: agent_id,
                source,
            })?;

        for order in orders {
            results.orders_submitted += 1;
            match self.market.submit_order(order) {
                Ok(new_fills) => fills.extend(new_fills),
                Err(MarketError::Book(
                    e @ (BookError::InvalidOrder(_) | BookError::DuplicateIdentity(_)),
                )) => {
                    warn!("Rejected order {} from {}: {}", order.order_id, agent_id, e);
                    results.orders_rejected += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        for pair in fills.chunks(2) {
            results.trades += 1;
            results.volume += pair[0].quantity();
        }
        self.route_fills(&fills);
        Ok(())
    }

    fn route_fills(&mut self, fills: &[MatchedOrder]) {
        for fill in fills {
            match self.agents.get_mut(&fill.order.agent_id) {
                Some(owner) => owner.agent.on_fill(fill),
                None => debug!(
                    "Fill for {} owned by unregistered {}",
                    fill.order.order_id, fill.order.agent_id
                ),
            }
        }
    }
}
