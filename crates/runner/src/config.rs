//! Simulation configuration
//!
//! Loaded from JSON. Every field has a default, so `{}` is a complete
//! configuration. Agent parameters are passed through to the agent factory
//! untouched.

use marketsim_core::Timestamp;
use marketsim_market::FundamentalConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Root configuration of a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Agents built through the agent factory
    #[serde(default = "default_num_background_agents")]
    pub num_background_agents: usize,

    /// Horizon; no arrival at or after this time is processed
    #[serde(default = "default_sim_time")]
    pub sim_time: Timestamp,

    /// Poisson arrival rate per agent, per tick
    #[serde(default = "default_arrival_rate")]
    pub arrival_rate: f64,

    #[serde(default)]
    pub fundamental: FundamentalConfig,

    #[serde(default)]
    pub agent: AgentParams,

    /// Master seed. Runs with the same seed are identical.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_num_background_agents() -> usize {
    15
}

fn default_sim_time() -> Timestamp {
    2000
}

fn default_arrival_rate() -> f64 {
    5e-3
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_background_agents: default_num_background_agents(),
            sim_time: default_sim_time(),
            arrival_rate: default_arrival_rate(),
            fundamental: FundamentalConfig::default(),
            agent: AgentParams::default(),
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Positivity checks on the engine-level parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_background_agents == 0 {
            return Err(ConfigError::Invalid(
                "num_background_agents must be positive".to_string(),
            ));
        }
        if self.sim_time == 0 {
            return Err(ConfigError::Invalid("sim_time must be positive".to_string()));
        }
        if !self.arrival_rate.is_finite() || self.arrival_rate <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "arrival_rate must be positive, got {}",
                self.arrival_rate
            )));
        }
        self.fundamental
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// Background agent parameters, opaque to the kernel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentParams {
    /// Maximum absolute inventory
    #[serde(default = "default_q_max")]
    pub q_max: u32,

    /// Variance of private values
    #[serde(default = "default_pv_var")]
    pub pv_var: f64,

    /// Price shading range
    #[serde(default = "default_shade")]
    pub shade: [f64; 2],

    #[serde(default = "default_eta")]
    pub eta: f64,
}

fn default_q_max() -> u32 {
    10
}

fn default_pv_var() -> f64 {
    5e6
}

fn default_shade() -> [f64; 2] {
    [250.0, 500.0]
}

fn default_eta() -> f64 {
    1.0
}

impl Default for AgentParams {
    fn default() -> Self {
        Self {
            q_max: default_q_max(),
            pv_var: default_pv_var(),
            shade: default_shade(),
            eta: default_eta(),
        }
    }
}
