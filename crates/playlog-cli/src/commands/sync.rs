//! Sync command - Upload the library and/or achievements
//!
//! `playlog sync [library|achievements|all] [--full]`

use anyhow::Result;
use clap::{Args, ValueEnum};

use playlog_core::domain::{SyncKind, SyncMode, SyncOutcome};

use crate::context::AppContext;
use crate::output::{get_formatter, OutputFormat};

/// Which catalog dimension to sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SyncTarget {
    Library,
    Achievements,
    All,
}

impl SyncTarget {
    fn kinds(self) -> &'static [SyncKind] {
        match self {
            SyncTarget::Library => &[SyncKind::Library],
            SyncTarget::Achievements => &[SyncKind::Achievements],
            SyncTarget::All => &[SyncKind::Library, SyncKind::Achievements],
        }
    }
}

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// What to sync
    #[arg(value_enum, default_value_t = SyncTarget::All)]
    pub target: SyncTarget,

    /// Upload the whole catalog instead of a diff
    #[arg(long)]
    pub full: bool,
}

impl SyncCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let mode = if self.full {
            SyncMode::Full
        } else {
            SyncMode::Diff
        };

        let mut failed = Vec::new();
        for &kind in self.target.kinds() {
            let outcome = match kind {
                SyncKind::Library => ctx.orchestrator.sync_library(mode).await,
                SyncKind::Achievements => ctx.orchestrator.sync_achievements(mode).await,
            };
            formatter.outcome(kind, outcome);
            if outcome == SyncOutcome::Error {
                failed.push(kind.to_string());
            }
        }

        if !failed.is_empty() {
            anyhow::bail!("sync failed: {}", failed.join(", "));
        }
        Ok(())
    }
}
