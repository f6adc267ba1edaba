use domain::DomainError;
use thiserror::Error;

/// Error hierarchy of the migration pipeline
///
/// Outcome reporting to users goes through the migration record
/// (`status`, `error_message`); these variants are for callers and logs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SuccessionError {
    /// Missing inventory, migration or agent. Never retried automatically.
    #[error("{0}")]
    NotFound(String),

    /// Reasoning service call failed
    #[error("Plan generation failed: {0}")]
    Generation(String),

    /// A single task failed. Recorded on the migration, never fatal to a run.
    #[error("Task '{task}' failed: {message}")]
    TaskExecution { task: String, message: String },

    /// Failure outside the per-task boundary. Marks the migration FAILED.
    #[error("Migration run aborted: {0}")]
    RunLoop(String),

    /// Operation not permitted in the current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type SuccessionResult<T> = Result<T, SuccessionError>;

impl SuccessionError {
    pub fn not_found(what: impl Into<String>) -> Self {
        SuccessionError::NotFound(what.into())
    }

    pub fn invalid_operation(what: impl Into<String>) -> Self {
        SuccessionError::InvalidOperation(what.into())
    }

    /// Errors the caller surfaces as a lookup failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, SuccessionError::NotFound(_))
    }
}

impl From<DomainError> for SuccessionError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound(what) => SuccessionError::NotFound(what),
            DomainError::Storage(msg) | DomainError::Serialization(msg) => {
                SuccessionError::Storage(msg)
            }
            other @ (DomainError::InvalidTransition { .. } | DomainError::UnknownStatus(_)) => {
                SuccessionError::InvalidOperation(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::MigrationStatus;

    #[test]
    fn test_domain_errors_are_mapped() {
        let err: SuccessionError = DomainError::InvalidTransition {
            from: MigrationStatus::Planning,
            to: MigrationStatus::InProgress,
        }
        .into();
        assert!(matches!(err, SuccessionError::InvalidOperation(_)));

        let err: SuccessionError = DomainError::Storage("database is locked".to_string()).into();
        assert_eq!(err, SuccessionError::Storage("database is locked".to_string()));

        let err: SuccessionError = DomainError::NotFound("migration 42".to_string()).into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_not_found_message_is_verbatim() {
        let err = SuccessionError::not_found("no inventory found for agent agent-1");
        assert_eq!(err.to_string(), "no inventory found for agent agent-1");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_task_failure_message_names_task() {
        let err = SuccessionError::TaskExecution {
            task: "Install VPN".to_string(),
            message: "exit code 1603".to_string(),
        };
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "Task 'Install VPN' failed: exit code 1603");
    }
}
