use thiserror::Error;

use async_openai::error::OpenAIError;

/// Errors surfaced by the completion client layer.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("missing model API key; set MODEL_API_KEY, OPENAI_API_KEY, or ANTHROPIC_API_KEY")]
    MissingApiKey,
    #[error("missing default model configuration")]
    MissingDefaultModel,
    #[error("invalid completion request: {0}")]
    InvalidRequest(String),
    #[error("model returned an empty completion")]
    EmptyCompletion,
    #[error(transparent)]
    OpenAi(#[from] OpenAIError),
}
