//! Status command - Display breaker, queue and sync cursor state
//!
//! Shows:
//! 1. Install id and circuit breaker state
//! 2. Pending operations waiting for delivery
//! 3. The active or queued play session
//! 4. Last sync per dimension, baseline sizes and cooldowns

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;

use playlog_sync::SyncStatus;

use crate::context::AppContext;
use crate::output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let status = ctx.orchestrator.status().await;

        match format {
            OutputFormat::Json => formatter.print_json(&serde_json::to_value(&status)?),
            OutputFormat::Human => show_status(&status, &*formatter),
        }
        Ok(())
    }
}

fn show_status(status: &SyncStatus, formatter: &dyn OutputFormatter) {
    formatter.success(&format!("Install {}", status.install_id));
    formatter.info(&format!(
        "Circuit: {} ({} consecutive failures)",
        status.breaker_state, status.breaker_failures
    ));
    formatter.info(&format!("Pending operations: {}", status.pending_operations));

    let session = &status.session;
    match (&session.active_game_id, &session.pending_start_game_id) {
        (Some(game), _) => formatter.info(&format!(
            "Playing: {} (session {})",
            game,
            session.active_session_id.as_deref().unwrap_or("?")
        )),
        (None, Some(game)) => formatter.info(&format!("Playing: {game} (start queued)")),
        (None, None) => formatter.info("Playing: nothing"),
    }

    let cursor = &status.cursor;
    formatter.info(&format!(
        "Last sync: {} ({} games)",
        describe_time(cursor.last_sync_at),
        cursor.last_sync_count
    ));
    formatter.info(&format!(
        "Library baseline: {} games, taken {}",
        status.library_baseline_size,
        describe_time(status.library_baseline_at)
    ));
    formatter.info(&format!(
        "Achievements baseline: {} games, taken {}",
        status.achievements_baseline_size,
        describe_time(status.achievements_baseline_at)
    ));

    let now = Utc::now();
    for (label, until) in [
        ("Library", cursor.library_cooldown_until),
        ("Achievements", cursor.achievement_diff_cooldown_until),
    ] {
        if let Some(until) = until.filter(|u| *u > now) {
            formatter.warn(&format!("{label} sync in cooldown until {}", until.to_rfc3339()));
        }
    }

    if !status.allowed_sources.is_empty() {
        formatter.info(&format!(
            "Allowed sources: {}",
            status.allowed_sources.join(", ")
        ));
    }
}

fn describe_time(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "never".to_string())
}
