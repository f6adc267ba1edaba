pub mod config;
pub mod inventory;
pub mod migration;

pub use config::ConfigCommand;
pub use inventory::InventoryCommand;
pub use migration::MigrationCommand;
