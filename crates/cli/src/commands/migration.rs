use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use console::style;
use domain::{Migration, MigrationStatus, NewMigration};
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use crate::app::AppContext;
use crate::display::{migration_row, print_migration, status_label};
use crate::progress::{spinner, MigrationProgress};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Args)]
pub struct MigrationCommand {
    #[command(subcommand)]
    pub command: MigrationSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum MigrationSubcommand {
    /// Create a migration record and generate its plan
    Create {
        name: String,
        /// Agent on the machine being replaced
        #[arg(long)]
        source: String,
        /// Agent on the replacement machine
        #[arg(long)]
        target: Option<String>,
        /// Leave the record in planning; run `migration plan` later
        #[arg(long)]
        no_plan: bool,
    },
    /// Generate a plan for a migration in planning
    Plan { id: String },
    /// Run a ready migration and follow its progress
    Start { id: String },
    Show {
        id: String,
        #[arg(long)]
        json: bool,
    },
    List {
        /// planning, ready, in_progress, completed, failed or cancelled
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        json: bool,
    },
    Cancel { id: String },
}

impl MigrationCommand {
    pub async fn execute(self, app: &AppContext) -> Result<()> {
        match self.command {
            MigrationSubcommand::Create {
                name,
                source,
                target,
                no_plan,
            } => {
                let migration = app
                    .migrations
                    .create(NewMigration {
                        name,
                        source_agent_id: source,
                        target_agent_id: target,
                    })
                    .await?;
                println!(
                    "{} Created migration {} ({})",
                    style("✓").green(),
                    style(migration.id).bold(),
                    status_label(migration.status)
                );
                if !no_plan {
                    run_planning(app, migration.id).await?;
                }
            }
            MigrationSubcommand::Plan { id } => {
                run_planning(app, parse_id(&id)?).await?;
            }
            MigrationSubcommand::Start { id } => {
                run_execution(app, parse_id(&id)?).await?;
            }
            MigrationSubcommand::Show { id, json } => {
                let migration = app.migrations.get(parse_id(&id)?).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&migration)?);
                } else {
                    print_migration(&migration);
                }
            }
            MigrationSubcommand::List { status, json } => {
                let status = status
                    .as_deref()
                    .map(str::parse::<MigrationStatus>)
                    .transpose()?;
                let migrations = app.migrations.list(status).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&migrations)?);
                } else if migrations.is_empty() {
                    println!("{}", style("No migrations").dim());
                } else {
                    for migration in &migrations {
                        println!("{}", migration_row(migration));
                    }
                }
            }
            MigrationSubcommand::Cancel { id } => {
                let migration = app.migrations.cancel(parse_id(&id)?).await?;
                if migration.status == MigrationStatus::Cancelled {
                    println!("{} Migration cancelled", style("✓").green());
                } else {
                    println!(
                        "{} Cancellation requested, migration is {}",
                        style("!").yellow(),
                        status_label(migration.status)
                    );
                }
            }
        }
        Ok(())
    }
}

pub fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).with_context(|| format!("Invalid migration id: {raw}"))
}

async fn run_planning(app: &AppContext, id: Uuid) -> Result<()> {
    let pb = spinner("Generating migration plan...");
    let mut handle = app.migrations.spawn_planning(id);

    let joined = tokio::select! {
        joined = &mut handle => joined,
        _ = tokio::signal::ctrl_c() => {
            pb.set_message("Cancelling...");
            if let Err(e) = app.migrations.cancel(id).await {
                warn!("Cancel request failed: {}", e);
            }
            handle.await
        }
    };
    pb.finish_and_clear();

    let migration = joined.map_err(|e| anyhow!("planning task panicked: {e}"))??;
    report_outcome(&migration);
    if migration.status == MigrationStatus::Ready {
        print_migration(&migration);
    }
    Ok(())
}

/// The run lives in this process; Ctrl-C turns into a cancel request
async fn run_execution(app: &AppContext, id: Uuid) -> Result<()> {
    let mut handle = app.migrations.start(id).await?;
    let first = app.migrations.get(id).await?;
    let progress = MigrationProgress::new(&first);
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    let mut cancel_sent = false;

    let joined = loop {
        tokio::select! {
            joined = &mut handle => break joined,
            _ = ticker.tick() => {
                match app.migrations.get(id).await {
                    Ok(current) => progress.update(&current),
                    Err(e) => warn!("Progress poll failed: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c(), if !cancel_sent => {
                cancel_sent = true;
                if let Err(e) = app.migrations.cancel(id).await {
                    warn!("Cancel request failed: {}", e);
                }
            }
        }
    };

    let migration = match joined.map_err(|e| anyhow!("run panicked: {e}"))? {
        Ok(migration) => migration,
        Err(e) => {
            // the run loop has already written FAILED when it could
            let stored = app.migrations.get(id).await?;
            progress.finish(&stored);
            return Err(e.into());
        }
    };
    progress.finish(&migration);
    report_outcome(&migration);
    Ok(())
}

fn report_outcome(migration: &Migration) {
    match migration.status {
        MigrationStatus::Ready => println!(
            "{} Plan ready: {} tasks",
            style("✓").green(),
            migration.tasks().len()
        ),
        MigrationStatus::Completed => println!(
            "{} {}",
            style("✓").green(),
            migration.success_message.as_deref().unwrap_or("completed")
        ),
        status => println!(
            "{} {}: {}",
            style("✗").red(),
            status_label(status),
            migration.error_message.as_deref().unwrap_or("no details")
        ),
    }
    for failed in &migration.failed_tasks {
        println!("    - {}: {}", failed.task.name, failed.error);
    }
}
