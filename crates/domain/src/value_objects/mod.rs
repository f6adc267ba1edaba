//! Value Objects - immutable domain concepts

mod migration_status;

pub use migration_status::MigrationStatus;
