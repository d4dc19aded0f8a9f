//! Background heartbeat task.
//!
//! The engine owns one of these per instance: spawned at construction,
//! stopped at shutdown or drop. The schedule is fixed-delay — the next sweep
//! starts a full delay after the previous one finished, not on a fixed rate.

use crate::config::HeartbeatConfig;
use crate::engine::EngineCore;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Handle to a running heartbeat task.
pub(crate) struct HeartbeatHandle {
    shutdown: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl HeartbeatHandle {
    /// Spawn the sweep loop on the current Tokio runtime.
    pub(crate) fn spawn(core: Arc<EngineCore>, config: HeartbeatConfig) -> Self {
        let (shutdown, shutdown_rx) = mpsc::channel(1);
        let handle = tokio::spawn(run(core, config, shutdown_rx));
        Self { shutdown, handle }
    }

    /// Stop the task by delivering the shutdown signal; the task breaks out
    /// of its `select!` at the next poll. The abort only fires when the
    /// signal cannot be delivered (channel full or task already gone).
    pub(crate) fn stop(self) {
        if self.shutdown.try_send(()).is_err() {
            self.handle.abort();
        }
    }
}

async fn run(core: Arc<EngineCore>, config: HeartbeatConfig, mut shutdown: mpsc::Receiver<()>) {
    debug!(
        initial_delay_ms = config.initial_delay.as_millis() as u64,
        next_delay_ms = config.next_delay.as_millis() as u64,
        "Starting heartbeat task"
    );

    let mut delay = config.initial_delay;

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                debug!("Heartbeat task shutting down");
                break;
            }
            () = tokio::time::sleep(delay) => {
                core.check_providers();
                // The sleep for the next round is created only after the
                // sweep above completed: fixed-delay semantics.
                delay = config.next_delay;
            }
        }
    }
}
