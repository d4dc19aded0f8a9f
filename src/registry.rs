//! Bounded, duplicate-free provider registry.

use crate::error::{BalancerError, BalancerResult};
use crate::provider::Provider;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Default registry bound.
pub const DEFAULT_MAX_CAPACITY: usize = 10;

/// An insertion-ordered, randomly-indexable collection of providers that
/// rejects duplicates (by provider id) and never grows past `max_capacity`.
///
/// The ordered sequence serves indexed reads; a membership set gives O(1)
/// duplicate detection. Both are kept in sync by every mutation.
///
/// NOTE: this container is NOT thread safe. The engine owns the
/// readers-writer lock and calls in here only from inside its critical
/// sections; keeping the lock out of the container avoids nested-lock hazards
/// and keeps it testable single-threaded.
pub struct UniqueRegistry {
    /// Insertion-ordered providers; all indexed reads go through this.
    items: Vec<Arc<dyn Provider>>,
    /// Ids of registered providers, for duplicate detection.
    ids: HashSet<String>,
    /// Hard bound on the number of providers.
    max_capacity: usize,
}

impl UniqueRegistry {
    /// Create an empty registry with the default bound of 10.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_capacity(DEFAULT_MAX_CAPACITY)
    }

    /// Create an empty registry with the given bound.
    #[must_use]
    pub fn with_max_capacity(max_capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            ids: HashSet::new(),
            max_capacity,
        }
    }

    /// Append every provider not already present, preserving input order.
    ///
    /// The bound is checked against the raw incoming batch size before
    /// anything is inserted, so an overflowing call applies nothing.
    /// Duplicates within an accepted batch are silently skipped.
    ///
    /// # Errors
    ///
    /// Returns [`BalancerError::CapacityExceeded`] if the current size plus
    /// the incoming count would exceed the bound.
    pub fn add_all(&mut self, new_items: Vec<Arc<dyn Provider>>) -> BalancerResult<()> {
        self.validate_size(new_items.len())?;

        for item in new_items {
            if self.ids.insert(item.id().to_string()) {
                self.items.push(item);
            } else {
                debug!(id = item.id(), "Skipping duplicate provider in batch");
            }
        }

        debug!(size = self.items.len(), "Registry after add_all");
        Ok(())
    }

    /// Append a single provider.
    ///
    /// Adding an already-registered id is a no-op (logged, not an error).
    ///
    /// # Errors
    ///
    /// Returns [`BalancerError::CapacityExceeded`] if the registry is full.
    pub fn add_one(&mut self, item: Arc<dyn Provider>) -> BalancerResult<()> {
        if self.ids.contains(item.id()) {
            info!(id = item.id(), "Provider already registered, not added again");
            return Ok(());
        }

        self.validate_size(1)?;
        self.ids.insert(item.id().to_string());
        self.items.push(item);
        debug!(size = self.items.len(), "Registry after add_one");
        Ok(())
    }

    /// Remove the provider with the given id. Absent ids are a no-op.
    pub fn remove(&mut self, id: &str) {
        if self.ids.remove(id) {
            self.items.retain(|item| item.id() != id);
            debug!(id, size = self.items.len(), "Registry after remove");
        } else {
            info!(id, "Provider not registered, nothing to remove");
        }
    }

    /// Whether a provider with the given id is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Get the provider at `index`, or `None` if the index is out of range.
    ///
    /// Callers treat a missing index as a benign race with a concurrent
    /// removal, so this is deliberately not an error.
    #[must_use]
    pub fn get_at_index(&self, index: usize) -> Option<&Arc<dyn Provider>> {
        self.items.get(index)
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Snapshot of the registered providers in insertion order.
    ///
    /// Returns a copy, never the live backing sequence, so callers cannot
    /// mutate the registry through aliasing.
    #[must_use]
    pub fn contents(&self) -> Vec<Arc<dyn Provider>> {
        self.items.clone()
    }

    /// Iterate the registered providers in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<dyn Provider>> {
        self.items.iter()
    }

    /// Registry bound.
    #[must_use]
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    fn validate_size(&self, add_count: usize) -> BalancerResult<()> {
        if self.items.len() + add_count > self.max_capacity {
            return Err(BalancerError::CapacityExceeded {
                current: self.items.len(),
                incoming: add_count,
                max_capacity: self.max_capacity,
            });
        }
        Ok(())
    }
}

impl Default for UniqueRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UniqueRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniqueRegistry")
            .field("ids", &self.ids)
            .field("size", &self.items.len())
            .field("max_capacity", &self.max_capacity)
            .finish()
    }
}
