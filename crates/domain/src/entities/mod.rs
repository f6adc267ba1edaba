//! Domain Entities - Core business objects
//!
//! Entities carry identity and business rules,
//! independent of infrastructure concerns.

pub mod inventory;
pub mod migration;
pub mod plan;

pub use inventory::{DataLocation, InventoryReport, InventorySnapshot, MetricsReport};
pub use migration::{FailedTask, Migration, NewMigration, SUCCESS_MESSAGE};
pub use plan::{MigrationPlan, TaskDescriptor};
