//! Run command - Foreground sync loop
//!
//! Flushes the queue, then syncs both dimensions at the configured
//! intervals until SIGINT or SIGTERM.

use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use playlog_sync::SyncScheduler;

use crate::context::AppContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct RunCommand {}

impl RunCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let scheduler = SyncScheduler::from_config(ctx.orchestrator.clone(), &ctx.config.sync);

        let cancel = CancellationToken::new();
        tokio::spawn(shutdown_signal(cancel.clone()));

        formatter.info("Running, press Ctrl+C to stop");
        scheduler.run(cancel).await;

        let pending = ctx.orchestrator.queue().len().await;
        if pending > 0 {
            formatter.warn(&format!("{pending} operation(s) still pending"));
        }
        formatter.success("Stopped");
        Ok(())
    }
}

/// Cancels `token` on SIGINT or SIGTERM
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }

    token.cancel();
}
