use common::{SuccessionError, SuccessionResult};
use tracing::warn;

use super::settings::{AppConfig, DatabaseSettings, LlmSettings, LoggingSettings};

const PROVIDERS: [&str; 3] = ["anthropic", "openai", "local"];
const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, config: &AppConfig) -> SuccessionResult<()> {
        self.validate_database(&config.database)?;
        self.validate_llm(&config.llm)?;
        self.validate_logging(&config.logging)?;
        Ok(())
    }

    fn validate_database(&self, config: &DatabaseSettings) -> SuccessionResult<()> {
        if config.path.as_os_str().is_empty() {
            return Err(invalid("database.path must not be empty"));
        }
        if config.pool_size == 0 {
            return Err(invalid("database.pool_size must be greater than 0"));
        }
        Ok(())
    }

    fn validate_llm(&self, config: &LlmSettings) -> SuccessionResult<()> {
        if !PROVIDERS.contains(&config.provider.as_str()) {
            return Err(invalid(format!(
                "llm.provider must be one of {}, got '{}'",
                PROVIDERS.join(", "),
                config.provider
            )));
        }
        if config.max_tokens == 0 {
            return Err(invalid("llm.max_tokens must be greater than 0"));
        }
        if !(0.0..=2.0).contains(&config.temperature) {
            return Err(invalid(format!(
                "llm.temperature must be between 0.0 and 2.0, got {}",
                config.temperature
            )));
        }
        if config.provider == "local" && config.base_url.is_none() {
            warn!("llm.base_url not set for local provider, using LOCAL_LLM_URL or localhost");
        }
        Ok(())
    }

    fn validate_logging(&self, config: &LoggingSettings) -> SuccessionResult<()> {
        if !LEVELS.contains(&config.level.to_lowercase().as_str()) {
            return Err(invalid(format!(
                "logging.level must be one of {}, got '{}'",
                LEVELS.join(", "),
                config.level
            )));
        }
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(message: impl Into<String>) -> SuccessionError {
    SuccessionError::Configuration(message.into())
}
