use marketsim_core::Timestamp;
use rand::Rng;
use rand_distr::{Distribution, Exp};

use crate::error::{SimulationError, SimulationResult};

/// Poisson arrival process on the integer clock
///
/// Gaps are exponential with the given rate, rounded up to whole ticks, so an
/// agent never arrives twice at the same instant.
#[derive(Debug, Clone, Copy)]
pub struct ArrivalProcess {
    rate: f64,
    gaps: Exp<f64>,
}

impl ArrivalProcess {
    pub fn new(rate: f64) -> SimulationResult<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(SimulationError::InvalidRate(rate));
        }
        let gaps = Exp::new(rate).map_err(|_| SimulationError::InvalidRate(rate))?;
        Ok(Self { rate, gaps })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Ticks until the next arrival, at least one
    pub fn next_gap<R: Rng + ?Sized>(&self, rng: &mut R) -> Timestamp {
        let gap = self.gaps.sample(rng).ceil();
        (gap as Timestamp).max(1)
    }

    /// Time of the next arrival after `now`. Saturates at the end of the
    /// clock, which lies past any horizon.
    pub fn next_arrival<R: Rng + ?Sized>(&self, now: Timestamp, rng: &mut R) -> Timestamp {
        now.saturating_add(self.next_gap(rng))
    }
}
