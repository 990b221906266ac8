//! Flush command - Deliver queued session events

use anyhow::Result;
use clap::Args;

use crate::context::AppContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct FlushCommand {}

impl FlushCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let report = ctx.orchestrator.flush_pending_operations().await?;
        formatter.flush_report(&report);
        Ok(())
    }
}
