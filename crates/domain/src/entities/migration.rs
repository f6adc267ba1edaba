//! Migration - aggregate root of the plan-and-execute workflow
//!
//! All status changes go through [`Migration::transition_to`], which consults
//! the [`MigrationStatus`] transition table and leaves the record untouched when
//! the move is illegal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::plan::{MigrationPlan, TaskDescriptor};
use crate::errors::{DomainError, DomainResult};
use crate::value_objects::MigrationStatus;

pub const SUCCESS_MESSAGE: &str = "Migration completed successfully";

/// A task that raised during execution, with its error text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedTask {
    pub task: TaskDescriptor,
    pub error: String,
}

/// Request to create a migration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMigration {
    pub name: String,
    pub source_agent_id: String,
    #[serde(default)]
    pub target_agent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Migration {
    pub id: Uuid,
    pub name: String,
    pub source_agent_id: String,
    pub target_agent_id: Option<String>,
    pub status: MigrationStatus,

    pub plan: Option<MigrationPlan>,

    // Progress
    pub current_task: Option<String>,
    pub progress_percent: f64,
    pub completed_tasks: Vec<TaskDescriptor>,
    pub failed_tasks: Vec<FailedTask>,

    // Timing
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    // Results
    pub success_message: Option<String>,
    pub error_message: Option<String>,
}

impl Migration {
    /// New record in PLANNING
    pub fn new(request: NewMigration) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: request.name,
            source_agent_id: request.source_agent_id,
            target_agent_id: request.target_agent_id,
            status: MigrationStatus::Planning,
            plan: None,
            current_task: None,
            progress_percent: 0.0,
            completed_tasks: Vec::new(),
            failed_tasks: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            success_message: None,
            error_message: None,
        }
    }

    /// Tasks of the attached plan, empty when no plan exists
    pub fn tasks(&self) -> &[TaskDescriptor] {
        self.plan
            .as_ref()
            .map(|plan| plan.tasks.as_slice())
            .unwrap_or(&[])
    }

    pub fn estimated_minutes(&self) -> Option<u32> {
        self.plan.as_ref().map(|plan| plan.estimated_minutes)
    }

    /// Apply a status change permitted by the transition table
    pub fn transition_to(&mut self, next: MigrationStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// PLANNING -> READY with the generated plan
    pub fn attach_plan(&mut self, plan: MigrationPlan) -> DomainResult<()> {
        self.transition_to(MigrationStatus::Ready)?;
        self.plan = Some(plan);
        Ok(())
    }

    /// READY -> IN_PROGRESS, resets progress bookkeeping
    pub fn begin_execution(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition_to(MigrationStatus::InProgress)?;
        self.started_at = Some(now);
        self.current_task = None;
        self.progress_percent = 0.0;
        self.completed_tasks.clear();
        self.failed_tasks.clear();
        Ok(())
    }

    /// Mark the current task; progress never moves backwards
    pub fn record_task_started(&mut self, name: String, progress_percent: f64) {
        self.current_task = Some(name);
        self.progress_percent = self.progress_percent.max(progress_percent.clamp(0.0, 100.0));
    }

    pub fn record_task_completed(&mut self, task: TaskDescriptor) {
        self.completed_tasks.push(task);
    }

    pub fn record_task_failed(&mut self, task: TaskDescriptor, error: impl Into<String>) {
        self.failed_tasks.push(FailedTask {
            task,
            error: error.into(),
        });
    }

    /// IN_PROGRESS -> COMPLETED or FAILED depending on recorded task failures
    pub fn finish_execution(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.failed_tasks.is_empty() {
            self.transition_to(MigrationStatus::Completed)?;
            self.success_message = Some(SUCCESS_MESSAGE.to_string());
            self.error_message = None;
        } else {
            self.transition_to(MigrationStatus::Failed)?;
            self.error_message = Some(format!("{} tasks failed", self.failed_tasks.len()));
            self.success_message = None;
        }
        self.progress_percent = 100.0;
        self.completed_at = Some(now);
        Ok(())
    }

    /// PLANNING or IN_PROGRESS -> FAILED with an error message
    pub fn fail(&mut self, message: impl Into<String>, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition_to(MigrationStatus::Failed)?;
        self.error_message = Some(message.into());
        self.success_message = None;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Any non-terminal state -> CANCELLED
    pub fn cancel(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition_to(MigrationStatus::Cancelled)?;
        self.error_message = Some(reason.into());
        self.success_message = None;
        self.completed_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> NewMigration {
        NewMigration {
            name: "Ana's laptop refresh".to_string(),
            source_agent_id: "agent-src".to_string(),
            target_agent_id: Some("agent-dst".to_string()),
        }
    }

    fn plan_with(names: &[&str]) -> MigrationPlan {
        MigrationPlan {
            tasks: names
                .iter()
                .enumerate()
                .map(|(i, name)| TaskDescriptor::new(*name, i as u32 + 1))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_migration_starts_in_planning() {
        let migration = Migration::new(request());
        assert_eq!(migration.status, MigrationStatus::Planning);
        assert!(migration.plan.is_none());
        assert!(migration.tasks().is_empty());
        assert_eq!(migration.progress_percent, 0.0);
    }

    #[test]
    fn test_happy_path_lifecycle() {
        let mut migration = Migration::new(request());
        migration.attach_plan(plan_with(&["a", "b"])).unwrap();
        assert_eq!(migration.status, MigrationStatus::Ready);

        let now = Utc::now();
        migration.begin_execution(now).unwrap();
        assert_eq!(migration.started_at, Some(now));

        for (i, task) in migration.tasks().to_vec().into_iter().enumerate() {
            migration.record_task_started(task.display_name(i), i as f64 * 50.0);
            migration.record_task_completed(task);
        }
        migration.finish_execution(Utc::now()).unwrap();

        assert_eq!(migration.status, MigrationStatus::Completed);
        assert_eq!(migration.success_message.as_deref(), Some(SUCCESS_MESSAGE));
        assert!(migration.error_message.is_none());
        assert_eq!(migration.progress_percent, 100.0);
        assert!(migration.completed_at.is_some());
    }

    #[test]
    fn test_failures_produce_failed_status() {
        let mut migration = Migration::new(request());
        migration.attach_plan(plan_with(&["a", "b"])).unwrap();
        migration.begin_execution(Utc::now()).unwrap();
        migration.record_task_failed(TaskDescriptor::new("a", 1), "disk full");
        migration.record_task_failed(TaskDescriptor::new("b", 2), "timeout");
        migration.finish_execution(Utc::now()).unwrap();

        assert_eq!(migration.status, MigrationStatus::Failed);
        assert_eq!(migration.error_message.as_deref(), Some("2 tasks failed"));
        assert!(migration.success_message.is_none());
    }

    #[test]
    fn test_illegal_start_leaves_record_untouched() {
        let mut migration = Migration::new(request());
        let before = migration.clone();

        let err = migration.begin_execution(Utc::now()).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: MigrationStatus::Planning,
                to: MigrationStatus::InProgress,
            }
        );
        assert_eq!(migration, before);
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut migration = Migration::new(request());
        migration.record_task_started("a".to_string(), 40.0);
        migration.record_task_started("b".to_string(), 10.0);
        assert_eq!(migration.progress_percent, 40.0);
        assert_eq!(migration.current_task.as_deref(), Some("b"));
    }

    #[test]
    fn test_cancel_only_from_non_terminal() {
        let mut migration = Migration::new(request());
        migration.cancel("operator request", Utc::now()).unwrap();
        assert_eq!(migration.status, MigrationStatus::Cancelled);
        assert!(migration.cancel("again", Utc::now()).is_err());
    }

    #[test]
    fn test_generation_failure() {
        let mut migration = Migration::new(request());
        migration
            .fail("no inventory found for agent agent-src", Utc::now())
            .unwrap();
        assert_eq!(migration.status, MigrationStatus::Failed);
        assert!(migration.attach_plan(MigrationPlan::default()).is_err());
        assert!(migration.plan.is_none());
    }
}
