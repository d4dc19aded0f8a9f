//! Load balancer engine: registry + strategy + retry protocol + heartbeat.

use crate::config::{BalancerConfig, HeartbeatConfig, StrategyKind};
use crate::error::{BalancerError, BalancerResult};
use crate::heartbeat::HeartbeatHandle;
use crate::provider::Provider;
use crate::registry::UniqueRegistry;
use crate::strategy::SelectionStrategy;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Point-in-time summary of provider count and total capacity.
///
/// Recomputed per `get` attempt, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateStatus {
    /// Number of registered providers.
    pub providers: usize,
    /// Sum of per-provider capacities.
    pub capacity: u64,
}

impl fmt::Display for AggregateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "providers={}, capacity={}", self.providers, self.capacity)
    }
}

/// Shared state behind the engine facade.
///
/// The registry is the single shared mutable resource; one coarse
/// readers-writer lock over the whole thing serializes writers against each
/// other and against readers. The registry itself holds no lock, so every
/// access from here is a critical section.
pub(crate) struct EngineCore {
    registry: RwLock<UniqueRegistry>,
    strategy: Box<dyn SelectionStrategy>,
    max_retry_count: u32,
    name: String,
}

impl EngineCore {
    /// Aggregate count and capacity under one shared section so the sums
    /// come from a consistent snapshot.
    fn aggregate_status(&self) -> AggregateStatus {
        let registry = self.registry.read().expect("registry lock poisoned");
        let capacity = registry
            .iter()
            .map(|provider| u64::from(provider.concurrent_capacity()))
            .sum();
        AggregateStatus {
            providers: registry.len(),
            capacity,
        }
    }

    /// One heartbeat sweep: snapshot the providers, then exclude every one
    /// that does not report alive.
    ///
    /// A panicking liveness probe is caught and the provider treated as dead,
    /// so one misbehaving provider can neither skip the rest of the sweep nor
    /// kill the recurring schedule.
    pub(crate) fn check_providers(&self) {
        let snapshot = self
            .registry
            .read()
            .expect("registry lock poisoned")
            .contents();

        info!(name = %self.name, providers = snapshot.len(), "Heartbeat sweep");

        for provider in snapshot {
            let alive = catch_unwind(AssertUnwindSafe(|| provider.is_alive())).unwrap_or_else(
                |_| {
                    warn!(id = provider.id(), "Liveness probe panicked, treating provider as dead");
                    false
                },
            );

            if !alive {
                info!(id = provider.id(), "Excluding dead provider");
                self.registry
                    .write()
                    .expect("registry lock poisoned")
                    .remove(provider.id());
            }
        }
    }
}

/// Client-side request router over a bounded set of providers.
///
/// All mutations (`register_all`, `include`, `exclude`, heartbeat eviction)
/// run under the exclusive side of the lock; `get` reads under the shared
/// side, picks an index through the strategy, and retries past failed or
/// missing candidates up to `max_retry_count`.
///
/// Any number of threads may call into the engine concurrently. The engine
/// owns the background heartbeat task and stops it on [`shutdown`] or drop.
///
/// [`shutdown`]: LoadBalancer::shutdown
pub struct LoadBalancer {
    core: Arc<EngineCore>,
    heartbeat: Option<HeartbeatHandle>,
}

impl LoadBalancer {
    /// Create an engine from configuration.
    ///
    /// When the heartbeat is enabled the background sweep task is spawned
    /// here and runs until the engine is shut down or dropped.
    ///
    /// # Panics
    ///
    /// Panics if the heartbeat is enabled and this is called outside a Tokio
    /// runtime.
    #[must_use]
    pub fn new(config: BalancerConfig) -> Self {
        let core = Arc::new(EngineCore {
            registry: RwLock::new(UniqueRegistry::with_max_capacity(config.max_capacity)),
            strategy: config.strategy.build(),
            max_retry_count: config.max_retry_count,
            name: config.name.clone(),
        });

        let heartbeat = config
            .heartbeat
            .enabled
            .then(|| HeartbeatHandle::spawn(Arc::clone(&core), config.heartbeat.clone()));

        info!(
            name = %core.name,
            strategy = core.strategy.name(),
            max_capacity = config.max_capacity,
            max_retry_count = core.max_retry_count,
            heartbeat = config.heartbeat.enabled,
            "Load balancer initialized"
        );

        Self { core, heartbeat }
    }

    /// Start building an engine from the default configuration.
    #[must_use]
    pub fn builder() -> LoadBalancerBuilder {
        LoadBalancerBuilder::default()
    }

    /// Serve one request from some registered provider.
    ///
    /// Each attempt aggregates the current status under a shared section,
    /// asks the strategy for an index, and re-reads the provider at that
    /// index under another shared section. A provider that vanished between
    /// the two sections is a benign race with a concurrent exclusion and is
    /// retried without consuming budget; a provider that reports dead
    /// consumes one retry.
    ///
    /// # Errors
    ///
    /// - [`BalancerError::NoProvidersAvailable`] when the registry is empty
    ///   or has zero aggregate capacity (structural, not retried).
    /// - [`BalancerError::NoSuitableProvider`] after `max_retry_count + 1`
    ///   attempts landed on dead providers.
    pub fn get(&self) -> BalancerResult<String> {
        let mut retry_count = 0;

        while retry_count <= self.core.max_retry_count {
            let status = self.core.aggregate_status();

            if status.capacity == 0 || status.providers == 0 {
                warn!(name = %self.core.name, %status, "No providers available");
                return Err(BalancerError::NoProvidersAvailable(status));
            }

            let index = self.core.strategy.pick(status.providers);

            let provider = self
                .core
                .registry
                .read()
                .expect("registry lock poisoned")
                .get_at_index(index)
                .cloned();

            // Another caller shrank the set between the two read sections;
            // the index race does not consume retry budget.
            let Some(provider) = provider else {
                debug!(index, "Provider index vanished, retrying");
                continue;
            };

            if provider.is_alive() {
                return Ok(provider.provide());
            }

            retry_count += 1;
        }

        warn!(
            name = %self.core.name,
            retries = self.core.max_retry_count,
            "No suitable provider was found"
        );
        Err(BalancerError::NoSuitableProvider {
            retries: self.core.max_retry_count,
        })
    }

    /// Register a batch of providers.
    ///
    /// # Errors
    ///
    /// Returns [`BalancerError::CapacityExceeded`] if the batch would overflow
    /// the registry; nothing is applied in that case.
    pub fn register_all(&self, providers: Vec<Arc<dyn Provider>>) -> BalancerResult<()> {
        self.core
            .registry
            .write()
            .expect("registry lock poisoned")
            .add_all(providers)
    }

    /// Re-include a provider. Already-registered ids are a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`BalancerError::CapacityExceeded`] if the registry is full.
    pub fn include(&self, provider: Arc<dyn Provider>) -> BalancerResult<()> {
        self.core
            .registry
            .write()
            .expect("registry lock poisoned")
            .add_one(provider)
    }

    /// Exclude a provider from load balancing. Unknown ids are a no-op.
    pub fn exclude(&self, provider: &dyn Provider) {
        self.exclude_id(provider.id());
    }

    /// Exclude a provider by id. Unknown ids are a no-op.
    pub fn exclude_id(&self, id: &str) {
        self.core
            .registry
            .write()
            .expect("registry lock poisoned")
            .remove(id);
    }

    /// Run one heartbeat sweep now.
    ///
    /// Idempotent; safe to invoke manually even while the background task is
    /// running.
    pub fn check_providers(&self) {
        self.core.check_providers();
    }

    /// Current provider count and aggregate capacity.
    #[must_use]
    pub fn status(&self) -> AggregateStatus {
        self.core.aggregate_status()
    }

    /// Diagnostic label of this engine.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Stop the background heartbeat task. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.stop();
        }
    }
}

impl Drop for LoadBalancer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for LoadBalancer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadBalancer")
            .field("name", &self.core.name)
            .field("strategy", &self.core.strategy.name())
            .field("max_retry_count", &self.core.max_retry_count)
            .field("status", &self.core.aggregate_status())
            .finish()
    }
}

/// Builder for [`LoadBalancer`].
#[derive(Debug, Default)]
pub struct LoadBalancerBuilder {
    config: BalancerConfig,
}

impl LoadBalancerBuilder {
    /// Set the diagnostic label.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the selection strategy.
    #[must_use]
    pub fn strategy(mut self, strategy: StrategyKind) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Set the registry bound.
    #[must_use]
    pub fn max_capacity(mut self, max_capacity: usize) -> Self {
        self.config.max_capacity = max_capacity;
        self
    }

    /// Set the per-call retry budget.
    #[must_use]
    pub fn max_retry_count(mut self, max_retry_count: u32) -> Self {
        self.config.max_retry_count = max_retry_count;
        self
    }

    /// Set the heartbeat configuration.
    #[must_use]
    pub fn heartbeat(mut self, heartbeat: HeartbeatConfig) -> Self {
        self.config.heartbeat = heartbeat;
        self
    }

    /// Build the engine.
    ///
    /// # Panics
    ///
    /// Panics if the heartbeat is enabled and this is called outside a Tokio
    /// runtime.
    #[must_use]
    pub fn build(self) -> LoadBalancer {
        LoadBalancer::new(self.config)
    }
}
