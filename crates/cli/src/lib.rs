//! Succession CLI library
//!
//! Command definitions, service wiring and terminal output for the
//! `succession` binary.

pub mod app;
pub mod commands;
pub mod display;
pub mod progress;

pub use app::{build_llm_client, AppContext};
pub use commands::{ConfigCommand, InventoryCommand, MigrationCommand};
