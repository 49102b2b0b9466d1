//! Configuration system for accolade.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AccoladeError, AccoladeResult};

fn default_sweep_interval() -> u64 {
    30
}

fn default_bus_capacity() -> usize {
    1024
}

fn default_journal_high_water() -> usize {
    1024
}

fn default_safety_factor() -> u64 {
    10
}

/// Main engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Interval of the timed-expiry sweep in seconds.
    ///
    /// Must stay at or below the shortest configured timed window divided by
    /// `timed_safety_factor` to bound expiry-detection latency.
    pub sweep_interval_secs: u64,
    /// Capacity of the completion event bus.
    pub bus_capacity: usize,
    /// Pending-update count above which a flush is overdue.
    pub journal_high_water: usize,
    /// Safety divisor applied to the shortest timed window when validating
    /// the sweep interval.
    pub timed_safety_factor: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval(),
            bus_capacity: default_bus_capacity(),
            journal_high_water: default_journal_high_water(),
            timed_safety_factor: default_safety_factor(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> AccoladeResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| AccoladeError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| AccoladeError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| AccoladeError::Configuration(e.to_string())),
            _ => Err(AccoladeError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Whether the sweep interval is tight enough for the shortest timed
    /// window currently configured.
    pub fn sweep_interval_ok(&self, shortest_window_secs: u64) -> bool {
        let bound = shortest_window_secs / self.timed_safety_factor.max(1);
        self.sweep_interval_secs <= bound.max(1)
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

/// Builder for EngineConfig.
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set the sweep interval in seconds.
    pub fn sweep_interval_secs(mut self, secs: u64) -> Self {
        self.config.sweep_interval_secs = secs;
        self
    }

    /// Set the event bus capacity.
    pub fn bus_capacity(mut self, capacity: usize) -> Self {
        self.config.bus_capacity = capacity;
        self
    }

    /// Set the journal high-water mark.
    pub fn journal_high_water(mut self, count: usize) -> Self {
        self.config.journal_high_water = count;
        self
    }

    /// Set the timed safety factor.
    pub fn timed_safety_factor(mut self, factor: u64) -> Self {
        self.config.timed_safety_factor = factor;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> EngineConfig {
        self.config
    }
}
