use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use cli::{AppContext, ConfigCommand, InventoryCommand, MigrationCommand};
use common::init_structured_logging;
use console::style;
use infrastructure::config::{ConfigLoader, ConfigValidator};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

#[derive(Parser)]
#[command(name = "succession")]
#[command(about = "PC succession: inventory, migration planning and execution")]
#[command(version)]
struct Cli {
    /// Configuration file, searched before the default locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Agent inventory snapshots
    Inventory(InventoryCommand),
    /// Migration records: plan, run, follow, cancel
    Migration(MigrationCommand),
    /// Configuration helpers
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = cli.config {
        if !path.exists() {
            bail!("config file {} not found", path.display());
        }
        loader = loader.with_path(path);
    }
    let (mut config, source) = loader.load_with_source().await?;

    if cli.json_logs {
        config.logging.json = true;
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    init_structured_logging(config.logging.to_logging_config())?;
    debug!("Configuration source: {:?}", source);

    match cli.command {
        Commands::Config(cmd) => cmd.execute(&config, &source).await,
        Commands::Inventory(cmd) => {
            ConfigValidator::new().validate(&config)?;
            let app = AppContext::open(&config)?;
            cmd.execute(&app).await
        }
        Commands::Migration(cmd) => {
            ConfigValidator::new().validate(&config)?;
            let app = AppContext::open(&config)?;
            cmd.execute(&app).await
        }
    }
}
