pub mod loader;
pub mod settings;
pub mod validator;

pub use loader::{ConfigLoader, ConfigSource, DEFAULT_ENV_PREFIX};
pub use settings::{AppConfig, DatabaseSettings, ExecutorSettings, LlmSettings, LoggingSettings};
pub use validator::ConfigValidator;
