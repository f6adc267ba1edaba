//! Domain Errors - Business rule violations
//!
//! Storage adapters report their failures through the `Storage` variant so the
//! repository ports stay free of infrastructure error types.

use crate::value_objects::MigrationStatus;
use thiserror::Error;

/// Domain-specific errors representing business rule violations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Business rule: the migration state machine forbids this move
    #[error("Invalid migration transition from {from} to {to}")]
    InvalidTransition {
        from: MigrationStatus,
        to: MigrationStatus,
    },

    /// Business validation: unknown status string
    #[error("Unknown migration status: {0}")]
    UnknownStatus(String),

    /// Business validation: record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Persistence adapter failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Stored payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Domain result type
pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Check if error is a business rule violation
    pub fn is_business_rule_error(&self) -> bool {
        matches!(
            self,
            DomainError::InvalidTransition { .. } | DomainError::UnknownStatus(_)
        )
    }

    /// Check if error came from the persistence layer
    pub fn is_infrastructure_error(&self) -> bool {
        matches!(
            self,
            DomainError::Storage(_) | DomainError::Serialization(_)
        )
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}
