//! # Provider Balancer
//!
//! A client-side request router that distributes `get()` calls across a
//! bounded, deduplicated set of backend providers.
//!
//! ## Features
//!
//! - **Multiple Strategies**: Uniform-random and lock-free round-robin selection
//! - **Heartbeat Eviction**: A periodic background sweep excludes dead providers
//! - **Bounded Registry**: Duplicate-free, capacity-limited provider set
//! - **Retry Protocol**: Transient races and dead picks are retried up to a budget
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  Load Balancer   │
//! │                  │
//! │  ┌────────────┐  │      ┌───────────┐
//! │  │ Selection  │──┼────▶│ Provider1 │
//! │  │ Strategy   │  │      └───────────┘
//! │  └────────────┘  │      ┌───────────┐
//! │        │         │────▶│ Provider2 │
//! │  ┌────────────┐  │      └───────────┘
//! │  │ Heartbeat  │  │      ┌───────────┐
//! │  │ Sweep      │──┼────▶│ Provider3 │
//! │  └────────────┘  │      └───────────┘
//! └──────────────────┘
//! ```
//!
//! The registry itself is a plain container; all mutual exclusion lives in the
//! engine, which serializes writers and lets readers share consistent
//! snapshots through a single readers-writer lock. See [`engine::LoadBalancer`].

pub mod config;
pub mod engine;
pub mod error;
mod heartbeat;
pub mod provider;
pub mod registry;
pub mod strategy;

pub use config::{BalancerConfig, HeartbeatConfig, StrategyKind};
pub use engine::{AggregateStatus, LoadBalancer, LoadBalancerBuilder};
pub use error::{BalancerError, BalancerResult};
pub use provider::{Provider, StaticProvider};
pub use registry::UniqueRegistry;
pub use strategy::{RandomSelection, RoundRobinSelection, SelectionStrategy};
