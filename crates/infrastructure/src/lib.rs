//! Configuration loading for the succession binaries

pub mod config;

pub use config::{AppConfig, ConfigLoader, ConfigValidator};
