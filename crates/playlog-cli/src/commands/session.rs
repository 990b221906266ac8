//! Start/stop commands - Report play sessions
//!
//! The session state is persisted, so `playlog start` and `playlog stop`
//! may run as separate processes.

use anyhow::Result;
use clap::Args;

use crate::context::AppContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct StartCommand {
    /// Library id of the game that started
    pub game_id: String,
}

impl StartCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        if ctx.orchestrator.on_game_started(&self.game_id).await? {
            formatter.success(&format!("Session started for {}", self.game_id));
        } else {
            formatter.warn(&format!(
                "Service unavailable, start of {} queued",
                self.game_id
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct StopCommand {
    /// Library id of the game that stopped
    pub game_id: String,

    /// Session length in seconds; derived from the start time if omitted
    #[arg(long)]
    pub seconds: Option<u64>,
}

impl StopCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        if ctx
            .orchestrator
            .on_game_stopped(&self.game_id, self.seconds)
            .await?
        {
            formatter.success(&format!("Session finished for {}", self.game_id));
        } else {
            formatter.warn(&format!("Finish of {} queued", self.game_id));
        }
        Ok(())
    }
}
