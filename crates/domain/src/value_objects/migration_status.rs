//! MigrationStatus - lifecycle states of a migration
//!
//! Pure domain value object, the transition table lives here so every writer
//! (plan generation, execution, cancellation) goes through the same rules.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::DomainError;

/// Lifecycle of a migration record
///
/// ```text
/// PLANNING -> READY -> IN_PROGRESS -> COMPLETED | FAILED
/// PLANNING -> FAILED
/// any non-terminal -> CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    /// Waiting for the plan generator
    #[default]
    Planning,
    /// Plan attached, may be started
    Ready,
    /// Executor owns the record
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl MigrationStatus {
    pub const ALL: [MigrationStatus; 6] = [
        MigrationStatus::Planning,
        MigrationStatus::Ready,
        MigrationStatus::InProgress,
        MigrationStatus::Completed,
        MigrationStatus::Failed,
        MigrationStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationStatus::Planning => "planning",
            MigrationStatus::Ready => "ready",
            MigrationStatus::InProgress => "in_progress",
            MigrationStatus::Completed => "completed",
            MigrationStatus::Failed => "failed",
            MigrationStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal states have no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MigrationStatus::Completed | MigrationStatus::Failed | MigrationStatus::Cancelled
        )
    }

    /// Check the transition table
    pub fn can_transition_to(&self, next: MigrationStatus) -> bool {
        use MigrationStatus::*;

        match (self, next) {
            (Planning, Ready) | (Planning, Failed) => true,
            (Ready, InProgress) => true,
            (InProgress, Completed) | (InProgress, Failed) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MigrationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "planning" => Ok(MigrationStatus::Planning),
            "ready" => Ok(MigrationStatus::Ready),
            "in_progress" => Ok(MigrationStatus::InProgress),
            "completed" => Ok(MigrationStatus::Completed),
            "failed" => Ok(MigrationStatus::Failed),
            "cancelled" | "canceled" => Ok(MigrationStatus::Cancelled),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}
