//! Sync scheduler - periodic library and achievement syncs
//!
//! The [`SyncScheduler`] drives a [`SyncOrchestrator`] for a long-running
//! host: it flushes the pending queue on start, keeps a recovery listener
//! attached to the breaker, and runs both catalog syncs at their intervals
//! until cancelled.
//!
//! ## Flow
//!
//! ```text
//!                     ┌── library tick ──────→ sync_library(Diff)
//! SyncScheduler::run ─┼── achievements tick ─→ sync_achievements(Diff)
//!                     ├── request_sync() ────→ both
//!                     └── breaker recovery ──→ flush_pending_operations()
//! ```

use std::{sync::Arc, time::Duration};

use tokio::{sync::Notify, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use playlog_core::config::SyncConfig;
use playlog_core::domain::SyncMode;

use crate::orchestrator::SyncOrchestrator;

/// Runs periodic syncs until cancelled
pub struct SyncScheduler {
    orchestrator: Arc<SyncOrchestrator>,
    library_interval: Duration,
    achievements_interval: Duration,
    sync_requested: Arc<Notify>,
}

impl SyncScheduler {
    pub fn new(
        orchestrator: Arc<SyncOrchestrator>,
        library_interval: Duration,
        achievements_interval: Duration,
    ) -> Self {
        info!(
            library_secs = library_interval.as_secs(),
            achievements_secs = achievements_interval.as_secs(),
            "Creating sync scheduler"
        );
        Self {
            orchestrator,
            library_interval,
            achievements_interval,
            sync_requested: Arc::new(Notify::new()),
        }
    }

    /// Creates a scheduler with the intervals of the `sync` config section
    pub fn from_config(orchestrator: Arc<SyncOrchestrator>, config: &SyncConfig) -> Self {
        Self::new(
            orchestrator,
            config.library_interval(),
            config.achievements_interval(),
        )
    }

    /// Handle that triggers both syncs immediately when notified
    pub fn sync_handle(&self) -> Arc<Notify> {
        self.sync_requested.clone()
    }

    /// Requests an immediate sync of both dimensions
    pub fn request_sync(&self) {
        info!("Immediate sync requested");
        self.sync_requested.notify_one();
    }

    /// Main loop. Returns once `cancel` fires.
    ///
    /// Both intervals tick immediately, so a fresh start syncs right after
    /// the initial flush.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("Sync scheduler starting");

        let listener = self.orchestrator.spawn_recovery_listener(cancel.child_token());

        match self.orchestrator.flush_pending_operations().await {
            Ok(report) if report.total() > 0 => {
                info!(
                    delivered = report.delivered,
                    requeued = report.requeued,
                    dropped = report.dropped,
                    "Startup flush complete"
                );
            }
            Ok(_) => debug!("Nothing pending at startup"),
            Err(e) => warn!(error = %e, "Startup flush failed"),
        }

        let mut library_timer = tokio::time::interval(self.library_interval);
        library_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut achievements_timer = tokio::time::interval(self.achievements_interval);
        achievements_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Cancellation requested, scheduler shutting down");
                    break;
                }
                _ = library_timer.tick() => {
                    self.orchestrator.sync_library(SyncMode::Diff).await;
                }
                _ = achievements_timer.tick() => {
                    self.orchestrator.sync_achievements(SyncMode::Diff).await;
                }
                _ = self.sync_requested.notified() => {
                    self.orchestrator.sync_library(SyncMode::Diff).await;
                    self.orchestrator.sync_achievements(SyncMode::Diff).await;
                }
            }
        }

        if let Err(e) = listener.await {
            warn!(error = %e, "Recovery listener ended abnormally");
        }
        info!("Sync scheduler stopped");
    }
}
