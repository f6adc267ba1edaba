use anyhow::Result;
use async_trait::async_trait;

use crate::{CompletionRequest, LlmClient};

/// External generative text service used to synthesize migration plans
///
/// Single round trip: a prompt in, the raw response text out.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[async_trait]
impl ReasoningService for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        LlmClient::complete(self, CompletionRequest::new(prompt)).await
    }
}
