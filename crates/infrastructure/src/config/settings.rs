use common::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_DB_FILE: &str = "succession.db";

/// Top-level configuration. Every section and key is optional in files.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSettings,
    pub llm: LlmSettings,
    pub executor: ExecutorSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: PathBuf,
    pub pool_size: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        let path = dirs::data_dir()
            .map(|dir| dir.join("succession").join(DEFAULT_DB_FILE))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE));
        Self { path, pool_size: 4 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// anthropic | openai | local
    pub provider: String,
    /// Provider default when unset
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Environment variable holding the API key, provider default when unset
    pub api_key_env: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: None,
            base_url: None,
            api_key_env: None,
            max_tokens: 8000,
            temperature: 0.2,
        }
    }
}

impl LlmSettings {
    pub fn api_key_env_name(&self) -> String {
        if let Some(name) = &self.api_key_env {
            return name.clone();
        }
        match self.provider.as_str() {
            "openai" => "OPENAI_API_KEY".to_string(),
            _ => "ANTHROPIC_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Per-task delay of the simulated runner
    pub task_delay_ms: u64,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            task_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingSettings {
    pub fn to_logging_config(&self) -> LoggingConfig {
        LoggingConfig::default()
            .with_level_name(&self.level)
            .with_json(self.json)
    }
}
