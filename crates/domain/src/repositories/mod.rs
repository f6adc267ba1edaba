//! Repository Abstractions - Ports for the store layer

mod inventory_repository;
mod migration_repository;

pub use inventory_repository::InventoryRepository;
pub use migration_repository::MigrationRepository;
