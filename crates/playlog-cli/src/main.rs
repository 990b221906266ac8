//! Playlog CLI - Command-line interface for Playlog
//!
//! Provides commands for:
//! - Reporting play sessions
//! - Syncing the library and achievements
//! - Flushing queued events
//! - Viewing breaker, queue and sync state
//! - Running the periodic sync loop in the foreground

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod library_file;
mod output;

use commands::{
    flush::FlushCommand,
    run::RunCommand,
    session::{StartCommand, StopCommand},
    status::StatusCommand,
    sync::SyncCommand,
};
use context::AppContext;
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "playlog", version, about = "Play-session and library telemetry client")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Library export file the catalog is read from
    #[arg(long, global = true, value_name = "EXPORT.JSON")]
    library: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upload the library and/or achievements
    Sync(SyncCommand),
    /// Deliver queued session events
    Flush(FlushCommand),
    /// Show breaker, queue and sync state
    Status(StatusCommand),
    /// Report that a game started
    Start(StartCommand),
    /// Report that a game stopped
    Stop(StopCommand),
    /// Sync periodically until interrupted
    Run(RunCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = context::load_config(cli.config.as_deref())?;

    // RUST_LOG wins, then -v, then the config file
    let filter = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    let ctx = AppContext::build(config, cli.library).await?;

    match cli.command {
        Commands::Sync(cmd) => cmd.execute(&ctx, format).await,
        Commands::Flush(cmd) => cmd.execute(&ctx, format).await,
        Commands::Status(cmd) => cmd.execute(&ctx, format).await,
        Commands::Start(cmd) => cmd.execute(&ctx, format).await,
        Commands::Stop(cmd) => cmd.execute(&ctx, format).await,
        Commands::Run(cmd) => cmd.execute(&ctx, format).await,
    }
}
