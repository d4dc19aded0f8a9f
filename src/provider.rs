//! Provider capability.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// A backend unit of work offering liveness and capacity signals.
///
/// Identity is the only key used for equality: two providers with the same
/// [`id`](Provider::id) are the same provider as far as the registry is
/// concerned. Liveness and capacity are observed fresh on every call and are
/// never cached by the balancer.
pub trait Provider: Send + Sync {
    /// Stable identity of this provider.
    fn id(&self) -> &str;

    /// Whether this provider can currently serve work.
    fn is_alive(&self) -> bool;

    /// Number of concurrent requests this provider claims to handle.
    fn concurrent_capacity(&self) -> u32;

    /// Produce a value.
    fn provide(&self) -> String;
}

impl fmt::Debug for dyn Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("id", &self.id())
            .field("alive", &self.is_alive())
            .field("capacity", &self.concurrent_capacity())
            .finish()
    }
}

/// A provider with a fixed id and capacity and a togglable liveness flag.
///
/// `provide()` returns the provider id, which is enough for a control surface
/// to tell which backend served a request.
#[derive(Debug)]
pub struct StaticProvider {
    /// Provider identity.
    id: String,
    /// Current liveness flag.
    alive: AtomicBool,
    /// Claimed concurrent capacity.
    capacity: u32,
}

impl StaticProvider {
    /// Create an alive provider with capacity 1.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_capacity(id, 1)
    }

    /// Create an alive provider with the given capacity.
    #[must_use]
    pub fn with_capacity(id: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: id.into(),
            alive: AtomicBool::new(true),
            capacity,
        }
    }

    /// Flip the liveness flag.
    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::Relaxed);
    }
}

impl Provider for StaticProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    fn concurrent_capacity(&self) -> u32 {
        self.capacity
    }

    fn provide(&self) -> String {
        self.id.clone()
    }
}
