//! Periodic eviction of expired records.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::store::StoreInner;

/// The background task evicting records older than the configured
/// retention.
///
/// Owned by the store: started at open, stopped through the shutdown
/// channel at close. A failed cycle is logged and abandoned; the next tick
/// retries independently.
pub(crate) struct RetentionCollector {
    inner: Arc<StoreInner>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl RetentionCollector {
    /// Spawn the collector as a background task.
    pub(crate) fn spawn(
        inner: Arc<StoreInner>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let collector = Self { inner, shutdown_rx };
        tokio::spawn(async move { collector.run().await })
    }

    async fn run(mut self) {
        let period = self.inner.config.gc_interval;
        info!(
            interval_secs = period.as_secs(),
            "Retention collector started"
        );

        // First tick lands one full interval out.
        let start = tokio::time::Instant::now() + period;
        let mut ticker = tokio::time::interval_at(start, period);

        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!("Retention collector shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let cutoff = Utc::now() - self.inner.config.retention;
                    match self.inner.gc(cutoff) {
                        Ok(deleted) => info!(deleted, "Completed retention cycle"),
                        // Never fatal to the store; the next tick retries.
                        Err(e) => error!(error = %e, "Retention cycle failed"),
                    }
                }
            }
        }
    }
}
