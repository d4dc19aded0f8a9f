//! Multi-threaded integration tests for the load balancer engine.
//!
//! These exercise the readers-writer discipline with real thread
//! interleavings, so they are repeated a few times per run.

use provider_balancer::{BalancerError, HeartbeatConfig, LoadBalancer, Provider, StaticProvider};
use std::sync::Arc;
use std::thread;
use tracing_subscriber::EnvFilter;

const REPEATS: usize = 5;

/// Route engine tracing output through the test harness, filtered by
/// `RUST_LOG`. Safe to call from every test; only the first init wins.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn engine(max_capacity: usize) -> Arc<LoadBalancer> {
    Arc::new(
        LoadBalancer::builder()
            .name("concurrency-test")
            .max_capacity(max_capacity)
            .heartbeat(HeartbeatConfig {
                enabled: false,
                ..HeartbeatConfig::default()
            })
            .build(),
    )
}

fn provider(id: String) -> Arc<dyn Provider> {
    Arc::new(StaticProvider::new(id))
}

#[test]
fn concurrent_register_all_overlapping_batches() {
    init_tracing();
    for _ in 0..REPEATS {
        let threads = 10;
        let lb = engine(100);

        let handles: Vec<_> = (0..threads)
            .map(|i| {
                let lb = Arc::clone(&lb);
                thread::spawn(move || {
                    // Thread i registers P0..=Pi, so every batch overlaps
                    // every other.
                    let batch: Vec<Arc<dyn Provider>> =
                        (0..=i).map(|n| provider(format!("P{n}"))).collect();
                    lb.register_all(batch).unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(lb.status().providers, threads);
    }
}

#[test]
fn concurrent_include_distinct_ids_loses_no_updates() {
    init_tracing();
    for _ in 0..REPEATS {
        let threads = 100;
        let lb = engine(100);

        let handles: Vec<_> = (0..threads)
            .map(|i| {
                let lb = Arc::clone(&lb);
                thread::spawn(move || {
                    lb.include(provider(format!("P{i}"))).unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(lb.status().providers, 100);
    }
}

#[test]
fn concurrent_include_then_exclude_leaves_empty_registry() {
    init_tracing();
    for _ in 0..REPEATS {
        let threads = 100;
        let lb = engine(100);

        let handles: Vec<_> = (0..threads)
            .map(|i| {
                let lb = Arc::clone(&lb);
                thread::spawn(move || {
                    let p = provider(format!("p{i}"));
                    lb.include(Arc::clone(&p)).unwrap();
                    lb.exclude(p.as_ref());
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let status = lb.status();
        assert_eq!(status.providers, 0);
        assert_eq!(status.capacity, 0);
        assert!(matches!(
            lb.get(),
            Err(BalancerError::NoProvidersAvailable(_))
        ));
    }
}

#[test]
fn get_succeeds_under_concurrent_churn() {
    init_tracing();
    let lb = engine(20);
    lb.register_all((0..5).map(|i| provider(format!("stable-{i}"))).collect())
        .unwrap();

    let churn = {
        let lb = Arc::clone(&lb);
        thread::spawn(move || {
            // Grow and shrink the set while readers are selecting, to force
            // index races between the status read and the indexed fetch.
            for round in 0..200 {
                let extra = provider(format!("extra-{}", round % 8));
                lb.include(Arc::clone(&extra)).unwrap();
                lb.exclude(extra.as_ref());
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let lb = Arc::clone(&lb);
            thread::spawn(move || {
                // The five stable alive providers never go away, so every
                // call must come back with a value.
                for _ in 0..200 {
                    let value = lb.get().unwrap();
                    assert!(value.starts_with("stable-") || value.starts_with("extra-"));
                }
            })
        })
        .collect();

    churn.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(lb.status().providers, 5);
}

#[test]
fn register_all_rejects_overflow_atomically() {
    init_tracing();
    let lb = engine(3);
    lb.register_all((0..3).map(|i| provider(format!("P{i}"))).collect())
        .unwrap();

    let result = lb.register_all(vec![provider("P9".to_string())]);
    assert!(matches!(result, Err(BalancerError::CapacityExceeded { .. })));
    assert_eq!(lb.status().providers, 3);
}
