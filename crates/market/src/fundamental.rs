//! Mean-reverting fundamental value process
//!
//! Evolves independently of order flow:
//! `next = current + reversion_rate * (mean - current) + shock`, with the
//! shock drawn from `N(0, shock_variance)`. The process starts at its mean.

use marketsim_core::Price;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::{MarketError, MarketResult};

/// Parameters of the fundamental value process
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FundamentalConfig {
    /// Long-run mean
    #[serde(default = "default_mean")]
    pub mean: Price,

    /// Fraction of the gap to the mean closed per step, in [0, 1]
    #[serde(default = "default_reversion_rate")]
    pub reversion_rate: f64,

    /// Variance of the per-step shock
    #[serde(default = "default_shock_variance")]
    pub shock_variance: f64,
}

fn default_mean() -> Price {
    1e5
}

fn default_reversion_rate() -> f64 {
    0.05
}

fn default_shock_variance() -> f64 {
    1e5
}

impl Default for FundamentalConfig {
    fn default() -> Self {
        Self {
            mean: default_mean(),
            reversion_rate: default_reversion_rate(),
            shock_variance: default_shock_variance(),
        }
    }
}

impl FundamentalConfig {
    pub fn validate(&self) -> MarketResult<()> {
        if !self.mean.is_finite() {
            return Err(MarketError::InvalidConfig(format!(
                "fundamental mean must be finite, got {}",
                self.mean
            )));
        }
        if !(0.0..=1.0).contains(&self.reversion_rate) {
            return Err(MarketError::InvalidConfig(format!(
                "reversion rate must be within [0, 1], got {}",
                self.reversion_rate
            )));
        }
        if !self.shock_variance.is_finite() || self.shock_variance < 0.0 {
            return Err(MarketError::InvalidConfig(format!(
                "shock variance must be non-negative, got {}",
                self.shock_variance
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FundamentalProcess {
    config: FundamentalConfig,
    seed: u64,
    rng: StdRng,
    shock: Normal<f64>,
    value: Price,
    /// Value after each step, starting with the initial value
    history: Vec<Price>,
}

impl FundamentalProcess {
    pub fn new(config: FundamentalConfig, seed: u64) -> MarketResult<Self> {
        config.validate()?;
        let shock = Normal::new(0.0, config.shock_variance.sqrt())
            .map_err(|e| MarketError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            config,
            seed,
            rng: StdRng::seed_from_u64(seed),
            shock,
            value: config.mean,
            history: vec![config.mean],
        })
    }

    /// Advance one step and return the new value
    pub fn step(&mut self) -> Price {
        let shock = self.shock.sample(&mut self.rng);
        self.value += self.config.reversion_rate * (self.config.mean - self.value) + shock;
        self.history.push(self.value);
        self.value
    }

    pub fn value(&self) -> Price {
        self.value
    }

    pub fn config(&self) -> &FundamentalConfig {
        &self.config
    }

    pub fn history(&self) -> &[Price] {
        &self.history
    }

    /// Back to the mean with the generator re-seeded, so a reset process
    /// replays the same path.
    pub fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.value = self.config.mean;
        self.history.clear();
        self.history.push(self.value);
    }
}
