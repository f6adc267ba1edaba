//! Domain Layer - PC succession business logic
//!
//! Contains ONLY pure business logic without dependencies on:
//! - Infrastructure (databases, file systems, networks)
//! - Frameworks (CLI, HTTP)
//! - External systems (reasoning services, remote task transports)
//!
//! - Entities: inventory snapshots, migration plans, the migration aggregate
//! - Value Objects: the migration status state machine
//! - Repository Abstractions: persistence ports implemented by the store crate

pub mod entities;
pub mod errors;
pub mod repositories;
mod serde_helpers;
pub mod value_objects;

pub use entities::{
    DataLocation, FailedTask, InventoryReport, InventorySnapshot, MetricsReport, Migration,
    MigrationPlan, NewMigration, TaskDescriptor, SUCCESS_MESSAGE,
};
pub use errors::{DomainError, DomainResult};
pub use repositories::{InventoryRepository, MigrationRepository};
pub use value_objects::MigrationStatus;
