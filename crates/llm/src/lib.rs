use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, error, info};

mod reasoning;

pub use reasoning::ReasoningService;

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_TOKENS: u32 = 8000;

const DEFAULT_LOCAL_URL: &str = "http://localhost:1234/v1";
const DEFAULT_LOCAL_MODEL: &str = "llama-3.2-3b-instruct";
const DEFAULT_TEMPERATURE: f32 = 0.2;

const ANTHROPIC_HOST: &str = "https://api.anthropic.com";
const OPENAI_HOST: &str = "https://api.openai.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, PartialEq)]
pub enum LlmProvider {
    OpenAI { api_key: String, model: String },
    Anthropic { api_key: String, model: String },
    /// OpenAI-compatible server (LM Studio, Ollama, vLLM)
    Local { url: String, model: String },
}

impl LlmProvider {
    /// Display name for logs
    pub fn name(&self) -> String {
        let (label, model) = match self {
            LlmProvider::OpenAI { model, .. } => ("OpenAI", model),
            LlmProvider::Anthropic { model, .. } => ("Anthropic", model),
            LlmProvider::Local { model, .. } => ("Local", model),
        };
        format!("{label} ({model})")
    }

    fn model(&self) -> &str {
        match self {
            LlmProvider::OpenAI { model, .. }
            | LlmProvider::Anthropic { model, .. }
            | LlmProvider::Local { model, .. } => model,
        }
    }

    /// Reads `LLM_PROVIDER` plus the variables that provider needs
    fn from_env() -> Result<Self> {
        let var_or =
            |name: &str, fallback: &str| env::var(name).unwrap_or_else(|_| fallback.to_string());
        let required = |name: &str| env::var(name).with_context(|| format!("{name} is not set"));

        let kind = var_or("LLM_PROVIDER", "anthropic");
        Ok(match kind.as_str() {
            "anthropic" => LlmProvider::Anthropic {
                api_key: required("ANTHROPIC_API_KEY")?,
                model: var_or("ANTHROPIC_MODEL", DEFAULT_ANTHROPIC_MODEL),
            },
            "openai" => LlmProvider::OpenAI {
                api_key: required("OPENAI_API_KEY")?,
                model: var_or("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            },
            "local" => LlmProvider::Local {
                url: var_or("LOCAL_LLM_URL", DEFAULT_LOCAL_URL),
                model: var_or("LOCAL_LLM_MODEL", DEFAULT_LOCAL_MODEL),
            },
            other => bail!("Unsupported LLM_PROVIDER: {other}"),
        })
    }
}

/// Per-call overrides on top of the client defaults
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub system_prompt: Option<String>,
}

impl CompletionRequest {
    pub fn new(prompt: &str) -> Self {
        Self {
            prompt: prompt.to_owned(),
            max_tokens: None,
            temperature: None,
            system_prompt: None,
        }
    }

    pub fn max_tokens(self, max_tokens: u32) -> Self {
        Self {
            max_tokens: Some(max_tokens),
            ..self
        }
    }

    pub fn temperature(self, temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            ..self
        }
    }

    pub fn system_prompt(self, system: &str) -> Self {
        Self {
            system_prompt: Some(system.to_owned()),
            ..self
        }
    }
}

/// HTTP client for the reasoning service
///
/// Single round trip per request, no streaming. The output size bound is
/// passed to the provider as `max_tokens`.
#[derive(Debug, Clone)]
pub struct LlmClient {
    provider: LlmProvider,
    http: reqwest::Client,
    max_tokens: u32,
    temperature: f32,
    base_url: Option<String>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Deserialize)]
struct MessagesReply {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

/// Everything that varies between providers for a single call
struct Route<'a> {
    url: String,
    headers: Vec<(&'static str, String)>,
    anthropic: bool,
    model: &'a str,
}

impl LlmClient {
    pub fn new(provider: LlmProvider, max_tokens: u32, temperature: f32) -> Self {
        Self {
            provider,
            http: reqwest::Client::new(),
            max_tokens,
            temperature,
            base_url: None,
        }
    }

    /// Point the client at a different host (proxies, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Build a client from `LLM_PROVIDER` and provider-specific variables.
    /// Loads `.env` when present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let provider = LlmProvider::from_env()?;
        let max_tokens = env::var("MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);
        let temperature = env::var("TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TEMPERATURE);

        Ok(Self::new(provider, max_tokens, temperature))
    }

    fn route(&self) -> Route<'_> {
        let host = |fallback: &str| {
            self.base_url
                .as_deref()
                .unwrap_or(fallback)
                .trim_end_matches('/')
                .to_string()
        };

        match &self.provider {
            LlmProvider::Anthropic { api_key, model } => Route {
                url: format!("{}/v1/messages", host(ANTHROPIC_HOST)),
                headers: vec![
                    ("x-api-key", api_key.clone()),
                    ("anthropic-version", ANTHROPIC_VERSION.to_string()),
                ],
                anthropic: true,
                model,
            },
            LlmProvider::OpenAI { api_key, model } => Route {
                url: format!("{}/v1/chat/completions", host(OPENAI_HOST)),
                headers: vec![("Authorization", format!("Bearer {api_key}"))],
                anthropic: false,
                model,
            },
            LlmProvider::Local { url, model } => {
                // Both "http://host:1234" and "http://host:1234/v1/" are accepted
                let root = host(url.as_str());
                let root = root.strip_suffix("/v1").unwrap_or(&root);
                Route {
                    url: format!("{root}/v1/chat/completions"),
                    headers: Vec::new(),
                    anthropic: false,
                    model,
                }
            }
        }
    }

    pub async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let provider = self.provider.name();
        let route = self.route();
        let max_tokens = request.max_tokens.unwrap_or(self.max_tokens);
        let temperature = request.temperature.unwrap_or(self.temperature);
        let system = request.system_prompt.as_deref();
        let user = Message {
            role: "user",
            content: &request.prompt,
        };

        info!("Sending completion request to {}", provider);
        debug!(url = %route.url, prompt_chars = request.prompt.len(), "POST");

        let mut call = self.http.post(&route.url);
        for (name, value) in &route.headers {
            call = call.header(*name, value);
        }
        call = if route.anthropic {
            call.json(&MessagesBody {
                model: route.model,
                max_tokens,
                temperature,
                system,
                messages: [user],
            })
        } else {
            let mut messages = Vec::with_capacity(2);
            if let Some(content) = system {
                messages.push(Message {
                    role: "system",
                    content,
                });
            }
            messages.push(user);
            call.json(&ChatBody {
                model: route.model,
                max_tokens,
                temperature,
                messages,
            })
        };

        let response = call.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("{} returned {}: {}", provider, status, body);
            return Err(anyhow!("{provider} error {status}: {body}"));
        }

        let text = if route.anthropic {
            let reply: MessagesReply = response.json().await?;
            reply.content.into_iter().map(|block| block.text).collect::<String>()
        } else {
            let reply: ChatReply = response.json().await?;
            reply
                .choices
                .into_iter()
                .next()
                .map(|choice| choice.message.content)
                .unwrap_or_default()
        };

        if text.is_empty() {
            bail!("Empty response from {provider}");
        }
        info!(
            "Received response from {} ({} chars, model {})",
            provider,
            text.len(),
            self.provider.model()
        );
        Ok(text)
    }
}
