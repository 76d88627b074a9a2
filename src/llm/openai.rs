use std::env;

use async_openai::error::OpenAIError;
use async_openai::types::{CreateChatCompletionRequest, CreateChatCompletionResponse};
use async_openai::{Client, config::OpenAIConfig};
use async_trait::async_trait;

use crate::config::CheckerConfig;

use super::error::LlmError;
use super::provider::CompletionProvider;

/// Implementation of [`CompletionProvider`] for OpenAI-compatible APIs.
///
/// The base-URL override makes Anthropic-compatible gateways and local
/// inference servers reachable through the same client.
#[derive(Clone, Debug)]
pub struct OpenAiCompletionProvider {
    client: Client<OpenAIConfig>,
}

impl OpenAiCompletionProvider {
    /// Wrap an existing `async-openai` client instance.
    pub fn new(client: Client<OpenAIConfig>) -> Self {
        Self { client }
    }

    /// Construct a provider using checker configuration values.
    pub fn from_config(config: &CheckerConfig) -> Result<Self, LlmError> {
        let api_key = config
            .model_api_key
            .clone()
            .or_else(|| env::var("MODEL_API_KEY").ok())
            .or_else(|| env::var("OPENAI_API_KEY").ok())
            .or_else(|| env::var("ANTHROPIC_API_KEY").ok())
            .ok_or(LlmError::MissingApiKey)?;

        let mut openai_config = OpenAIConfig::new().with_api_key(api_key);

        if let Some(base_url) = config.model_base_url.as_deref() {
            openai_config = openai_config.with_api_base(base_url);
        }

        Ok(Self::new(Client::with_config(openai_config)))
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletionProvider {
    async fn complete(
        &self,
        request: CreateChatCompletionRequest,
    ) -> Result<CreateChatCompletionResponse, OpenAIError> {
        self.client.chat().create(request).await
    }
}
