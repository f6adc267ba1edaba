//! Migration Executor: runs a plan's tasks in order against one migration record

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use common::{SuccessionError, SuccessionResult};
use domain::{Migration, MigrationRepository, MigrationStatus, TaskDescriptor};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Performs one task on the target machine
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn run(&self, task: &TaskDescriptor, migration: &Migration) -> Result<()>;
}

/// Runner that only waits and logs; stands in for a remote agent transport
#[derive(Debug, Clone)]
pub struct SimulatedTaskRunner {
    delay: Duration,
}

impl SimulatedTaskRunner {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedTaskRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl TaskRunner for SimulatedTaskRunner {
    async fn run(&self, task: &TaskDescriptor, migration: &Migration) -> Result<()> {
        info!(
            migration_id = %migration.id,
            order = task.order,
            "Executing task: {}",
            task.name
        );
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

pub struct MigrationExecutor {
    migrations: Arc<dyn MigrationRepository>,
    runner: Arc<dyn TaskRunner>,
}

/// How a run loop ended without error
enum RunEnd {
    /// The terminal state (completed, failed or cancelled) is stored
    Finished,
    /// Another writer moved the stored record out of IN_PROGRESS
    Superseded,
}

impl MigrationExecutor {
    pub fn new(migrations: Arc<dyn MigrationRepository>, runner: Arc<dyn TaskRunner>) -> Self {
        Self { migrations, runner }
    }

    /// Run every task of an IN_PROGRESS migration and persist each step.
    ///
    /// Every write is conditional on the stored record still being
    /// IN_PROGRESS. When another writer got there first (a cancel from a
    /// second process) the run stops at the next task boundary and the
    /// stored record is returned unchanged.
    ///
    /// Task failures are recorded and the run continues. Any other failure
    /// marks the migration FAILED and comes back as `RunLoop`.
    #[instrument(skip(self, migration, cancel), fields(migration_id = %migration.id))]
    pub async fn execute(
        &self,
        migration: Migration,
        cancel: CancellationToken,
    ) -> SuccessionResult<Migration> {
        if migration.status != MigrationStatus::InProgress {
            return Err(SuccessionError::invalid_operation(format!(
                "migration {} is {}, expected in_progress",
                migration.id, migration.status
            )));
        }

        let mut migration = migration;
        match self.run_tasks(&mut migration, &cancel).await {
            Ok(RunEnd::Finished) => {
                info!(
                    status = %migration.status,
                    completed = migration.completed_tasks.len(),
                    failed = migration.failed_tasks.len(),
                    "Migration run finished"
                );
                Ok(migration)
            }
            Ok(RunEnd::Superseded) => {
                let stored = self.migrations.get(migration.id).await?.ok_or_else(|| {
                    SuccessionError::not_found(format!("migration {} not found", migration.id))
                })?;
                warn!(status = %stored.status, "Record changed by another writer, run stopped");
                Ok(stored)
            }
            Err(err) => {
                let message = err.to_string();
                error!("Migration run aborted: {}", message);
                if migration.fail(message.clone(), Utc::now()).is_ok() {
                    match self.persist(&migration).await {
                        Ok(true) => {}
                        Ok(false) => warn!("Failed state not stored, record changed elsewhere"),
                        Err(save_err) => warn!("Could not persist failed migration: {}", save_err),
                    }
                }
                Err(SuccessionError::RunLoop(message))
            }
        }
    }

    async fn run_tasks(
        &self,
        migration: &mut Migration,
        cancel: &CancellationToken,
    ) -> SuccessionResult<RunEnd> {
        let tasks = migration.tasks().to_vec();
        let total = tasks.len();

        for (index, task) in tasks.into_iter().enumerate() {
            if cancel.is_cancelled() {
                let mut cancelled = migration.clone();
                cancelled.cancel(
                    format!("migration cancelled after {index} of {total} tasks"),
                    Utc::now(),
                )?;
                if !self.persist(&cancelled).await? {
                    return Ok(RunEnd::Superseded);
                }
                *migration = cancelled;
                info!("Migration cancelled before task {}", index + 1);
                return Ok(RunEnd::Finished);
            }

            let name = task.display_name(index);
            let progress = index as f64 / total as f64 * 100.0;
            migration.record_task_started(name.clone(), progress);
            if !self.persist(migration).await? {
                return Ok(RunEnd::Superseded);
            }
            debug!(task = %name, progress, "Task started");

            match self.runner.run(&task, migration).await {
                Ok(()) => migration.record_task_completed(task),
                Err(e) => {
                    let failure = SuccessionError::TaskExecution {
                        task: name,
                        message: e.to_string(),
                    };
                    warn!("{}", failure);
                    migration.record_task_failed(task, e.to_string());
                }
            }
            if !self.persist(migration).await? {
                return Ok(RunEnd::Superseded);
            }
        }

        // the record only changes once the terminal state is stored
        let mut finished = migration.clone();
        finished.finish_execution(Utc::now())?;
        if !self.persist(&finished).await? {
            return Ok(RunEnd::Superseded);
        }
        *migration = finished;
        Ok(RunEnd::Finished)
    }

    /// False when the stored record is no longer IN_PROGRESS
    async fn persist(&self, migration: &Migration) -> SuccessionResult<bool> {
        self.migrations
            .save_if_status(migration, MigrationStatus::InProgress)
            .await
            .map_err(SuccessionError::from)
    }
}
