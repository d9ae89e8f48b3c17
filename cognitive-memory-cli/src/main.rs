use std::path::PathBuf;

use clap::Parser;
use cognitive_memory_cli::commands::{self, Commands};
use cognitive_memory_cli::config::{connect, load_config};
use cognitive_memory_cli::output::OutputFormat;

#[derive(Parser)]
#[command(name = "cognitive-memory")]
#[command(about = "Command-line interface for the cognitive memory engine")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Enable verbose (debug-level) logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = load_config(cli.config.as_deref())?;
    let connected = connect(&config).await?;
    tracing::debug!(backend = ?connected.backend, "connected to memory store");

    commands::handle(cli.command, &connected.memory, &config, cli.format).await
}
