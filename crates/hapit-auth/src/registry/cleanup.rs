//! Periodic registry cleanup task.
//!
//! The registry already sweeps inline when an index crosses its high-water
//! mark; this wrapper lets the server additionally run the same sweep on a
//! timer as an external concern.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use super::store::{CleanupReport, SessionRegistry};

/// Runs [`SessionRegistry::cleanup_expired`] on a fixed interval until
/// shutdown is signalled.
#[derive(Clone)]
pub struct RegistryCleanup {
    /// Registry to sweep.
    registry: Arc<SessionRegistry>,
    /// Time between sweeps.
    interval: Duration,
}

impl std::fmt::Debug for RegistryCleanup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryCleanup")
            .field("interval", &self.interval)
            .finish()
    }
}

impl RegistryCleanup {
    /// Creates a new cleanup task wrapper.
    pub fn new(registry: Arc<SessionRegistry>, interval: Duration) -> Self {
        Self { registry, interval }
    }

    /// Runs one sweep cycle.
    pub fn run_cleanup(&self) -> CleanupReport {
        self.registry.cleanup_expired()
    }

    /// Loops sweeping until the shutdown channel flips to `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately; skip it so startup does not
        // trigger a sweep of an empty registry.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cleanup();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("Registry cleanup task shutting down");
                        return;
                    }
                }
            }
        }
    }
}
