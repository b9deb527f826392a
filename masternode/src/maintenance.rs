//! Periodic registry upkeep: the sweep and snapshot persistence.
//!
//! The core exposes no timers of its own; this task drives them from the
//! node runtime.

use crate::chain::ChainView;
use crate::registry::Registry;
use crate::snapshot::SnapshotFile;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// How often entries are re-checked and the dead ones erased.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// How often the registry is persisted to disk.
pub const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Drive sweeps and snapshot saves until the task is aborted.
pub async fn run(registry: Arc<Registry>, chain: Arc<dyn ChainView>, snapshot: SnapshotFile) {
    let mut sweep_tick = tokio::time::interval(SWEEP_INTERVAL);
    let mut save_tick = tokio::time::interval(SNAPSHOT_INTERVAL);

    loop {
        tokio::select! {
            _ = sweep_tick.tick() => {
                let now = Utc::now().timestamp();
                registry.sweep(now, chain.as_ref());
                debug!(entries = registry.len(), "registry sweep complete");
            }
            _ = save_tick.tick() => {
                if let Err(err) = snapshot.save(&registry) {
                    warn!(%err, "failed to persist masternode cache");
                }
            }
        }
    }
}
