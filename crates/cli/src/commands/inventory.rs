use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use console::style;
use domain::{InventoryReport, MetricsReport};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

use crate::app::AppContext;
use crate::display::print_snapshot;

#[derive(Debug, Args)]
pub struct InventoryCommand {
    #[command(subcommand)]
    pub command: InventorySubcommand,
}

#[derive(Debug, Subcommand)]
pub enum InventorySubcommand {
    /// Store a new inventory report for an agent
    Ingest {
        agent_id: String,
        /// JSON inventory report
        file: PathBuf,
    },
    /// Merge usage metrics into the agent's latest snapshot
    Metrics {
        agent_id: String,
        /// JSON metrics report
        file: PathBuf,
    },
    /// Show the latest snapshot of an agent
    Show {
        agent_id: String,
        /// Print the full snapshot as JSON
        #[arg(long)]
        json: bool,
    },
}

impl InventoryCommand {
    pub async fn execute(self, app: &AppContext) -> Result<()> {
        match self.command {
            InventorySubcommand::Ingest { agent_id, file } => {
                let report: InventoryReport = read_json(&file).await?;
                let snapshot = app.inventory.ingest(&agent_id, report).await?;
                println!(
                    "{} Stored snapshot {} for {} ({} applications, {} MB)",
                    style("✓").green(),
                    snapshot.id,
                    style(&snapshot.agent_id).cyan(),
                    snapshot.total_applications,
                    snapshot.total_data_size_mb
                );
            }
            InventorySubcommand::Metrics { agent_id, file } => {
                let metrics: MetricsReport = read_json(&file).await?;
                match app.inventory.record_metrics(&agent_id, metrics).await? {
                    Some(snapshot) => println!(
                        "{} Metrics merged into snapshot {}",
                        style("✓").green(),
                        snapshot.id
                    ),
                    None => println!(
                        "{} No inventory for {}, metrics dropped",
                        style("!").yellow(),
                        agent_id
                    ),
                }
            }
            InventorySubcommand::Show { agent_id, json } => {
                let snapshot = app.inventory.latest(&agent_id).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&snapshot)?);
                } else {
                    print_snapshot(&snapshot);
                }
            }
        }
        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}
