use marketsim_core::{Price, Timestamp};
use serde::{Deserialize, Serialize};

/// Read-only market snapshot handed to an agent when it arrives
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketView {
    pub time: Timestamp,
    /// Simulation horizon
    pub sim_time: Timestamp,
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    /// Current fundamental value
    pub fundamental: Price,
    /// Long-run mean of the fundamental process
    pub mean: Price,
    /// Per-step reversion rate of the fundamental process
    pub reversion_rate: f64,
}

impl MarketView {
    /// Expected fundamental value at the horizon given the current value.
    ///
    /// Shocks are zero mean, so only the mean reversion survives in expectation.
    pub fn estimated_final_fundamental(&self) -> Price {
        let remaining = self.sim_time.saturating_sub(self.time);
        let decay = (1.0 - self.reversion_rate).powf(remaining as f64);
        self.mean + decay * (self.fundamental - self.mean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(time: Timestamp, fundamental: Price) -> MarketView {
        MarketView {
            time,
            sim_time: 100,
            best_bid: None,
            best_ask: None,
            fundamental,
            mean: 1000.0,
            reversion_rate: 0.05,
        }
    }

    #[test]
    fn test_estimate_at_horizon_is_current_value() {
        assert_eq!(view(100, 1200.0).estimated_final_fundamental(), 1200.0);
    }

    #[test]
    fn test_estimate_reverts_towards_mean() {
        let estimate = view(0, 1200.0).estimated_final_fundamental();
        assert!(estimate > 1000.0);
        assert!(estimate < 1200.0);
    }
}
