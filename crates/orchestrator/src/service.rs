//! Migration use cases: create, plan, start, cancel, query

use chrono::Utc;
use common::{SuccessionError, SuccessionResult};
use domain::{
    InventoryRepository, Migration, MigrationRepository, MigrationStatus, NewMigration,
};
use llm::ReasoningService;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::claims::ExecutionClaims;
use crate::executor::{MigrationExecutor, TaskRunner};
use crate::planner::PlanGenerator;

pub const PLANNING_CANCELLED_MESSAGE: &str = "migration cancelled during planning";
pub const OPERATOR_CANCELLED_MESSAGE: &str = "migration cancelled by operator";

pub struct MigrationService {
    migrations: Arc<dyn MigrationRepository>,
    generator: Arc<PlanGenerator>,
    executor: Arc<MigrationExecutor>,
    claims: ExecutionClaims,
}

impl MigrationService {
    pub fn new(
        migrations: Arc<dyn MigrationRepository>,
        inventory: Arc<dyn InventoryRepository>,
        reasoning: Arc<dyn ReasoningService>,
        runner: Arc<dyn TaskRunner>,
    ) -> Self {
        Self {
            generator: Arc::new(PlanGenerator::new(inventory, reasoning)),
            executor: Arc::new(MigrationExecutor::new(Arc::clone(&migrations), runner)),
            migrations,
            claims: ExecutionClaims::new(),
        }
    }

    pub fn claims(&self) -> &ExecutionClaims {
        &self.claims
    }

    /// Persist a new PLANNING record
    #[instrument(skip(self, request), fields(source = %request.source_agent_id))]
    pub async fn create(&self, request: NewMigration) -> SuccessionResult<Migration> {
        if request.source_agent_id.trim().is_empty() {
            return Err(SuccessionError::invalid_operation(
                "source agent id is required",
            ));
        }

        let migration = Migration::new(request);
        self.migrations.save(&migration).await?;
        info!(migration_id = %migration.id, "Migration created");
        Ok(migration)
    }

    /// Create a record and generate its plan in the background
    pub async fn create_and_plan(
        self: &Arc<Self>,
        request: NewMigration,
    ) -> SuccessionResult<(Migration, JoinHandle<SuccessionResult<Migration>>)> {
        let migration = self.create(request).await?;
        let handle = self.spawn_planning(migration.id);
        Ok((migration, handle))
    }

    pub fn spawn_planning(self: &Arc<Self>, id: Uuid) -> JoinHandle<SuccessionResult<Migration>> {
        let service = Arc::clone(self);
        tokio::spawn(async move { service.plan(id).await })
    }

    /// Generate and attach a plan.
    ///
    /// The outcome lands on the record: READY with a plan, FAILED with the
    /// generation error, or CANCELLED. Records not in PLANNING are left as is.
    /// The outcome is stored only if the record is still PLANNING; otherwise
    /// the stored record is returned as found.
    #[instrument(skip(self))]
    pub async fn plan(&self, id: Uuid) -> SuccessionResult<Migration> {
        let guard = self.claims.try_claim(id).ok_or_else(|| {
            SuccessionError::invalid_operation(format!("migration {id} is busy"))
        })?;

        let mut migration = self.load(id).await?;
        if migration.status != MigrationStatus::Planning {
            return Err(SuccessionError::invalid_operation(format!(
                "migration {id} is {}, expected planning",
                migration.status
            )));
        }

        let token = guard.token();
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = self.generator.generate(&migration.source_agent_id) => Some(result),
        };

        match outcome {
            None => {
                migration.cancel(PLANNING_CANCELLED_MESSAGE, Utc::now())?;
                info!("Planning cancelled");
            }
            Some(Ok(plan)) => {
                info!(tasks = plan.tasks.len(), "Plan attached");
                migration.attach_plan(plan)?;
            }
            Some(Err(err)) => {
                warn!("Plan generation failed: {}", err);
                migration.fail(err.to_string(), Utc::now())?;
            }
        }

        if self
            .migrations
            .save_if_status(&migration, MigrationStatus::Planning)
            .await?
        {
            return Ok(migration);
        }
        let stored = self.load(id).await?;
        warn!(status = %stored.status, "Planning outcome dropped, record changed elsewhere");
        Ok(stored)
    }

    /// Move a READY migration to IN_PROGRESS and run it in the background.
    ///
    /// The READY to IN_PROGRESS write is conditional, so only one caller
    /// sharing the store can start a given migration. The claim is held by
    /// the spawned run until it finishes.
    #[instrument(skip(self))]
    pub async fn start(&self, id: Uuid) -> SuccessionResult<JoinHandle<SuccessionResult<Migration>>> {
        let guard = self.claims.try_claim(id).ok_or_else(|| {
            SuccessionError::invalid_operation(format!("migration {id} is already running"))
        })?;

        let mut migration = self.load(id).await?;
        ensure_ready(&migration)?;

        migration.begin_execution(Utc::now())?;
        if !self
            .migrations
            .save_if_status(&migration, MigrationStatus::Ready)
            .await?
        {
            ensure_ready(&self.load(id).await?)?;
            return Err(SuccessionError::invalid_operation(format!(
                "migration {id} changed while starting"
            )));
        }
        info!(tasks = migration.tasks().len(), "Migration started");

        let executor = Arc::clone(&self.executor);
        let token = guard.token();
        Ok(tokio::spawn(async move {
            let _guard = guard;
            executor.execute(migration, token).await
        }))
    }

    /// Cancel a migration.
    ///
    /// A migration held by a running unit of this service is only signalled;
    /// that unit writes CANCELLED. Otherwise the record is cancelled here
    /// with a conditional write, and a unit elsewhere notices at its next
    /// write.
    #[instrument(skip(self))]
    pub async fn cancel(&self, id: Uuid) -> SuccessionResult<Migration> {
        let migration = self.load(id).await?;
        ensure_not_terminal(&migration)?;

        if self.claims.signal_cancel(id) {
            info!("Cancellation signalled to running unit");
            return Ok(migration);
        }

        let Some(_guard) = self.claims.try_claim(id) else {
            // claimed between the two checks
            self.claims.signal_cancel(id);
            return Ok(migration);
        };

        // status only moves forward, so this settles within a few rounds
        loop {
            let mut migration = self.load(id).await?;
            ensure_not_terminal(&migration)?;
            let expected = migration.status;
            migration.cancel(OPERATOR_CANCELLED_MESSAGE, Utc::now())?;
            if self.migrations.save_if_status(&migration, expected).await? {
                info!("Migration cancelled");
                return Ok(migration);
            }
            debug!(%expected, "Record changed while cancelling, retrying");
        }
    }

    pub async fn get(&self, id: Uuid) -> SuccessionResult<Migration> {
        self.load(id).await
    }

    pub async fn list(&self, status: Option<MigrationStatus>) -> SuccessionResult<Vec<Migration>> {
        Ok(self.migrations.list(status).await?)
    }

    async fn load(&self, id: Uuid) -> SuccessionResult<Migration> {
        self.migrations
            .get(id)
            .await?
            .ok_or_else(|| SuccessionError::not_found(format!("migration {id} not found")))
    }
}

fn ensure_ready(migration: &Migration) -> SuccessionResult<()> {
    if migration.status == MigrationStatus::Ready {
        return Ok(());
    }
    Err(SuccessionError::invalid_operation(format!(
        "migration {} is {}, only ready migrations can start",
        migration.id, migration.status
    )))
}

fn ensure_not_terminal(migration: &Migration) -> SuccessionResult<()> {
    if !migration.status.is_terminal() {
        return Ok(());
    }
    Err(SuccessionError::invalid_operation(format!(
        "migration {} is already {}",
        migration.id, migration.status
    )))
}
