//! Provider selection strategies.

use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::trace;

/// Policy choosing which registered provider index serves the next request.
///
/// Implementations must be non-blocking: `pick` is called between the
/// engine's two read-locked sections and must never hold a lock of its own.
pub trait SelectionStrategy: Send + Sync {
    /// Pick an index in `[0, total)`.
    ///
    /// Callers guarantee `total > 0`.
    fn pick(&self, total: usize) -> usize;

    /// Strategy name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Uniform-random selection.
#[derive(Debug, Default)]
pub struct RandomSelection;

impl RandomSelection {
    /// Create a new random selection strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SelectionStrategy for RandomSelection {
    fn pick(&self, total: usize) -> usize {
        rand::rng().random_range(0..total)
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

/// Lock-free round-robin selection.
///
/// A shared counter advances by compare-and-swap, so concurrent callers never
/// commit the same transition and no caller ever blocks. The counter starts
/// at 0 and advances before returning, so the very first pick is index 1 and
/// the cycle runs `1, 2, …, total - 1, 0, 1, …`.
#[derive(Debug, Default)]
pub struct RoundRobinSelection {
    /// Monotonically advancing position, kept within `[0, total)` modulo the
    /// total passed to the most recent pick.
    counter: AtomicUsize,
}

impl RoundRobinSelection {
    /// Create a new round-robin strategy with the counter at 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
        }
    }
}

impl SelectionStrategy for RoundRobinSelection {
    fn pick(&self, total: usize) -> usize {
        loop {
            let current = self.counter.load(Ordering::Acquire);
            let next = (current + 1) % total;
            trace!(total, current, next, "Round-robin pick attempt");

            if self
                .counter
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return next;
            }
        }
    }

    fn name(&self) -> &'static str {
        "round-robin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_random_stays_in_range() {
        let strategy = RandomSelection::new();
        for total in [1, 3, 5, 10, 15] {
            for _ in 0..100 {
                assert!(strategy.pick(total) < total);
            }
        }
    }

    #[test]
    fn test_random_single_option() {
        let strategy = RandomSelection::new();
        assert_eq!(strategy.pick(1), 0);
    }

    #[test]
    fn test_round_robin_starts_at_one() {
        let strategy = RoundRobinSelection::new();
        assert_eq!(strategy.pick(3), 1);
        assert_eq!(strategy.pick(3), 2);
        assert_eq!(strategy.pick(3), 0);
        assert_eq!(strategy.pick(3), 1);
    }

    #[test]
    fn test_round_robin_cycles_serially() {
        for total in [1usize, 3, 5, 10, 15] {
            let strategy = RoundRobinSelection::new();

            // The total-th pick of the cycle lands back on index 0.
            for _ in 1..total {
                strategy.pick(total);
            }
            assert_eq!(strategy.pick(total), 0, "total={total}");
        }
    }

    #[test]
    fn test_round_robin_window_visits_each_index_once() {
        let total = 7;
        let strategy = RoundRobinSelection::new();

        // Skip into the middle of the cycle, then check one full window.
        for _ in 0..3 {
            strategy.pick(total);
        }

        let mut seen = vec![0u32; total];
        for _ in 0..total {
            seen[strategy.pick(total)] += 1;
        }
        assert!(seen.iter().all(|&count| count == 1), "seen: {seen:?}");
    }

    #[test]
    fn test_round_robin_concurrent_exactly_once_advancement() {
        let total = 5;
        let rounds = 40;
        let threads = 8;
        let strategy = Arc::new(RoundRobinSelection::new());

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let strategy = Arc::clone(&strategy);
                thread::spawn(move || {
                    let mut picks = Vec::with_capacity(rounds * total / threads);
                    for _ in 0..(rounds * total / threads) {
                        picks.push(strategy.pick(total));
                    }
                    picks
                })
            })
            .collect();

        let mut counts: HashMap<usize, usize> = HashMap::new();
        for handle in handles {
            for pick in handle.join().unwrap() {
                *counts.entry(pick).or_default() += 1;
            }
        }

        // Every pick commits exactly one counter transition, so over a whole
        // number of cycles each index is returned the same number of times.
        for index in 0..total {
            assert_eq!(counts.get(&index), Some(&rounds), "counts: {counts:?}");
        }
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(RandomSelection::new().name(), "random");
        assert_eq!(RoundRobinSelection::new().name(), "round-robin");
    }
}
