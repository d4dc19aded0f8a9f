//! Balancer configuration types.

use crate::strategy::{RandomSelection, RoundRobinSelection, SelectionStrategy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a load balancer engine.
///
/// Everything is optional with stated defaults; the configuration is
/// immutable once the engine is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancerConfig {
    /// Label used only for diagnostics. Defaults to `"unnamed"`; set it to
    /// tell engines apart in logs.
    pub name: String,

    /// Maximum number of registered providers.
    pub max_capacity: usize,

    /// Retry budget for a single `get` call.
    pub max_retry_count: u32,

    /// Selection strategy.
    pub strategy: StrategyKind,

    /// Heartbeat sweep settings.
    pub heartbeat: HeartbeatConfig,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            name: "unnamed".to_string(),
            max_capacity: 10,
            max_retry_count: 3,
            strategy: StrategyKind::default(),
            heartbeat: HeartbeatConfig::default(),
        }
    }
}

impl BalancerConfig {
    /// Parse a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns the underlying error if the TOML is malformed.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Selection strategy kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Uniform-random selection.
    #[default]
    Random,
    /// Lock-free round-robin selection.
    RoundRobin,
}

impl StrategyKind {
    /// Instantiate the strategy this kind names.
    #[must_use]
    pub fn build(self) -> Box<dyn SelectionStrategy> {
        match self {
            Self::Random => Box::new(RandomSelection::new()),
            Self::RoundRobin => Box::new(RoundRobinSelection::new()),
        }
    }
}

/// Heartbeat sweep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Run the background sweep. When disabled, `check_providers` can still
    /// be invoked manually.
    pub enabled: bool,

    /// Delay before the first sweep.
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,

    /// Delay between the end of one sweep and the start of the next
    /// (fixed-delay, not fixed-rate).
    #[serde(with = "humantime_serde")]
    pub next_delay: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay: Duration::from_secs(10),
            next_delay: Duration::from_secs(10),
        }
    }
}
