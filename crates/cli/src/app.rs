//! Wiring: configuration -> stores -> reasoning service -> services

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use infrastructure::config::{AppConfig, LlmSettings};
use llm::{LlmClient, LlmProvider, ReasoningService, DEFAULT_ANTHROPIC_MODEL, DEFAULT_OPENAI_MODEL};
use orchestrator::{InventoryService, MigrationService, SimulatedTaskRunner};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use store::SqliteStore;
use tracing::{debug, warn};

const DEFAULT_LOCAL_URL: &str = "http://localhost:1234/v1";
const DEFAULT_LOCAL_MODEL: &str = "llama-3.2-3b-instruct";

pub struct AppContext {
    pub inventory: InventoryService,
    pub migrations: Arc<MigrationService>,
}

impl AppContext {
    pub fn open(config: &AppConfig) -> Result<Self> {
        if let Some(parent) = config.database.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
        }

        let store = Arc::new(
            SqliteStore::open(&config.database.path, config.database.pool_size)
                .with_context(|| format!("Failed to open {}", config.database.path.display()))?,
        );
        debug!("Store opened at {}", config.database.path.display());

        let reasoning: Arc<dyn ReasoningService> = match build_llm_client(&config.llm) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                // inventory and listing commands work without a reasoning service
                warn!("Reasoning service unavailable: {}", e);
                Arc::new(UnavailableReasoning {
                    reason: e.to_string(),
                })
            }
        };

        let runner = Arc::new(SimulatedTaskRunner::new(Duration::from_millis(
            config.executor.task_delay_ms,
        )));

        Ok(Self {
            inventory: InventoryService::new(store.clone()),
            migrations: Arc::new(MigrationService::new(
                store.clone(),
                store,
                reasoning,
                runner,
            )),
        })
    }
}

/// Build a client from the `[llm]` section; the API key comes from the environment
pub fn build_llm_client(settings: &LlmSettings) -> Result<LlmClient> {
    let provider = match settings.provider.as_str() {
        "anthropic" => LlmProvider::Anthropic {
            api_key: api_key(settings)?,
            model: settings
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
        },
        "openai" => LlmProvider::OpenAI {
            api_key: api_key(settings)?,
            model: settings
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
        },
        "local" => LlmProvider::Local {
            url: settings
                .base_url
                .clone()
                .or_else(|| env::var("LOCAL_LLM_URL").ok())
                .unwrap_or_else(|| DEFAULT_LOCAL_URL.to_string()),
            model: settings
                .model
                .clone()
                .or_else(|| env::var("LOCAL_LLM_MODEL").ok())
                .unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string()),
        },
        other => bail!("Unsupported LLM provider: {}", other),
    };

    let mut client = LlmClient::new(provider, settings.max_tokens, settings.temperature);
    if let Some(url) = &settings.base_url {
        client = client.with_base_url(url.clone());
    }
    Ok(client)
}

fn api_key(settings: &LlmSettings) -> Result<String> {
    let name = settings.api_key_env_name();
    env::var(&name)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| anyhow!("{} is not set", name))
}

/// Stand-in when no client could be built; planning then fails with the reason
struct UnavailableReasoning {
    reason: String,
}

#[async_trait]
impl ReasoningService for UnavailableReasoning {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(anyhow!("reasoning service unavailable: {}", self.reason))
    }
}
