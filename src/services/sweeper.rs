//! Reconciliation sweep for documents stranded in `processing`.
//!
//! A process restart mid-ingestion leaves the document row in
//! `processing` forever; the background pipeline that would have
//! finalized it is gone. The sweep periodically marks such rows as
//! `failed` once they are older than a threshold, so the status column
//! stays honest. Re-upload is the remediation, same as any failure.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::models::SweeperConfig;
use crate::storage::DocumentStore;

/// Spawn the periodic sweep, or return `None` when disabled
/// (`interval_secs = 0`).
pub fn spawn_sweeper(
    store: Arc<dyn DocumentStore>,
    config: SweeperConfig,
) -> Option<JoinHandle<()>> {
    if config.interval_secs == 0 {
        return None;
    }

    let stale_after = chrono::Duration::seconds(config.stale_after_secs as i64);
    let mut ticker = tokio::time::interval(Duration::from_secs(config.interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    Some(tokio::spawn(async move {
        // The first tick fires immediately; skip it so a restart loop
        // doesn't sweep documents that are still legitimately in flight.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match store.fail_stale_processing(stale_after).await {
                Ok(0) => {}
                Ok(count) => {
                    tracing::warn!(count, "marked stale processing documents as failed");
                }
                Err(e) => {
                    tracing::error!(error = %e, "stale-document sweep failed");
                }
            }
        }
    }))
}
