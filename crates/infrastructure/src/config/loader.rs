use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use super::settings::AppConfig;

pub const DEFAULT_ENV_PREFIX: &str = "SUCCESSION_";

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File(PathBuf),
    Default,
}

/// Defaults, then the first config file found, then environment overrides
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    env_prefix: String,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_paths: Self::default_config_paths(),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// Search this path before the defaults
    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.config_paths.insert(0, path);
        self
    }

    /// Replace the search list entirely
    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.config_paths = paths;
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("succession.toml")];

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".config").join("succession").join("config.toml"));
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("succession").join("config.toml");
            if !paths.contains(&platform) {
                paths.push(platform);
            }
        }

        paths
    }

    pub async fn load(&self) -> Result<AppConfig> {
        let (config, source) = self.load_with_source().await?;
        debug!("Configuration source: {:?}", source);
        Ok(config)
    }

    pub async fn load_with_source(&self) -> Result<(AppConfig, ConfigSource)> {
        // API keys usually live in .env
        dotenv::dotenv().ok();

        let mut config = AppConfig::default();
        let mut source = ConfigSource::Default;

        for path in &self.config_paths {
            if !path.exists() {
                continue;
            }
            match self.load_file(path).await {
                Ok(file_config) => {
                    info!("Loaded configuration from: {}", path.display());
                    config = file_config;
                    source = ConfigSource::File(path.clone());
                    break;
                }
                Err(e) => {
                    warn!("Failed to load config from {}: {:#}", path.display(), e);
                }
            }
        }

        let config = self.apply_env_overrides(config)?;
        Ok((config, source))
    }

    async fn load_file(&self, path: &Path) -> Result<AppConfig> {
        let content = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content).context("Failed to parse JSON config"),
            _ => toml::from_str(&content).context("Failed to parse TOML config"),
        }
    }

    fn var(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", self.env_prefix, key))
            .ok()
            .filter(|value| !value.trim().is_empty())
    }

    fn parsed<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>>
    where
        T::Err: std::fmt::Display,
    {
        match self.var(key) {
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| anyhow::anyhow!("Invalid {}{}={}: {}", self.env_prefix, key, raw, e)),
            None => Ok(None),
        }
    }

    fn apply_env_overrides(&self, mut config: AppConfig) -> Result<AppConfig> {
        // Database
        if let Some(path) = self.var("DB_PATH") {
            config.database.path = PathBuf::from(path);
        }
        if let Some(size) = self.parsed("DB_POOL_SIZE")? {
            config.database.pool_size = size;
        }

        // Reasoning service
        if let Some(provider) = self.var("LLM_PROVIDER") {
            config.llm.provider = provider.to_lowercase();
        }
        if let Some(model) = self.var("LLM_MODEL") {
            config.llm.model = Some(model);
        }
        if let Some(url) = self.var("LLM_BASE_URL") {
            config.llm.base_url = Some(url);
        }
        if let Some(name) = self.var("LLM_API_KEY_ENV") {
            config.llm.api_key_env = Some(name);
        }
        if let Some(tokens) = self.parsed("LLM_MAX_TOKENS")? {
            config.llm.max_tokens = tokens;
        }
        if let Some(temperature) = self.parsed("LLM_TEMPERATURE")? {
            config.llm.temperature = temperature;
        }

        // Executor
        if let Some(delay) = self.parsed("TASK_DELAY_MS")? {
            config.executor.task_delay_ms = delay;
        }

        // Logging
        if let Some(level) = self.var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(json) = self.var("LOG_JSON") {
            config.logging.json = matches!(json.to_lowercase().as_str(), "true" | "1" | "yes");
        }

        Ok(config)
    }

    pub async fn save_config(&self, config: &AppConfig, path: &Path) -> Result<()> {
        let content = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(config)?,
            _ => toml::to_string_pretty(config)?,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(path, content).await?;
        info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    pub fn generate_example_config() -> String {
        toml::to_string_pretty(&AppConfig::default()).unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
