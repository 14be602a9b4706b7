//! Cadence CLI - Command-line interface
//!
//! Provides command-line access to the content-delivery engine: drip
//! schedule inspection, status listing and headless viewer runs.

mod commands;

use cadence_core::tracing_setup::{CliLogLevel, init_tracing};
use clap::Parser;

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Course content-delivery engine")]
struct Cli {
    /// Console log verbosity
    #[arg(long, value_enum, default_value_t = CliLogLevel::Warn)]
    log_level: CliLogLevel,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_tracing_level(), None)
        .map_err(|e| anyhow::anyhow!("tracing init failed: {e}"))?;

    commands::handle_command(cli.command).await?;

    Ok(())
}
