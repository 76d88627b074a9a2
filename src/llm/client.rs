use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
};

use crate::config::CheckerConfig;
use crate::logging::CheckerLogger;

use super::error::LlmError;
use super::openai::OpenAiCompletionProvider;
use super::provider::CompletionProvider;

/// Callback invoked after a successful completion to capture metrics.
pub type MetricsCallback =
    Arc<dyn Fn(&CreateChatCompletionResponse, Duration, &str) + Send + Sync + 'static>;

/// The synchronous, non-streaming subset of request parameters the pipeline
/// needs: one prompt in, one completion out, under a token bound.
#[derive(Debug, Default, Clone)]
pub struct CompletionOptions {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Provider-neutral completion client.
pub struct CompletionClient<P: CompletionProvider> {
    provider: P,
    default_model: String,
    logger: Option<Arc<CheckerLogger>>,
    metrics_callback: Option<MetricsCallback>,
}

impl<P> fmt::Debug for CompletionClient<P>
where
    P: CompletionProvider + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionClient")
            .field("provider", &self.provider)
            .field("default_model", &self.default_model)
            .field("logger_attached", &self.logger.is_some())
            .field("metrics_callback", &self.metrics_callback.is_some())
            .finish()
    }
}

impl<P: CompletionProvider> CompletionClient<P> {
    /// Create a new client with the supplied provider and default model.
    pub fn new(default_model: impl Into<String>, provider: P) -> Self {
        Self {
            provider,
            default_model: default_model.into(),
            logger: None,
            metrics_callback: None,
        }
    }

    pub fn with_logger(mut self, logger: Option<Arc<CheckerLogger>>) -> Self {
        self.logger = logger;
        self
    }

    /// Attach a metrics callback invoked after successful completions.
    pub fn with_metrics_callback(mut self, callback: Option<MetricsCallback>) -> Self {
        self.metrics_callback = callback;
        self
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Access the underlying provider (primarily for testing).
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Construct a single-user-message request from a prompt and options.
    pub fn build_request(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<CreateChatCompletionRequest, LlmError> {
        let model = options
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        if model.trim().is_empty() {
            return Err(LlmError::MissingDefaultModel);
        }

        let user = ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(ChatCompletionRequestUserMessageContent::Text(
                    prompt.to_string(),
                ))
                .build()
                .map_err(|err| LlmError::InvalidRequest(err.to_string()))?,
        );

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(model);
        builder.messages(vec![user]);
        if let Some(max_tokens) = options.max_tokens {
            builder.max_completion_tokens(max_tokens);
        }
        if let Some(temperature) = options.temperature {
            builder.temperature(temperature);
        }

        builder
            .build()
            .map_err(|err| LlmError::InvalidRequest(err.to_string()))
    }

    /// Send one user-role prompt and return the first choice's text content.
    pub async fn complete_text(
        &self,
        prompt: &str,
        options: &CompletionOptions,
        operation: &str,
    ) -> Result<String, LlmError> {
        let request = self.build_request(prompt, options)?;
        let model = request.model.clone();

        self.log_debug(&format!(
            "Sending completion request: model={model} operation={operation} prompt_bytes={}",
            prompt.len()
        ));

        let start = Instant::now();
        let response = match self.provider.complete(request).await {
            Ok(response) => response,
            Err(err) => {
                self.log_error(&format!("Completion failed for model={model}: {err}"));
                return Err(LlmError::OpenAi(err));
            }
        };
        let elapsed = start.elapsed();

        if let Some(callback) = &self.metrics_callback {
            callback(&response, elapsed, operation);
        }
        self.log_debug(&format!(
            "Completion succeeded: model={model} duration={}ms",
            elapsed.as_millis()
        ));

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyCompletion)
    }

    fn log_debug(&self, message: &str) {
        if let Some(logger) = &self.logger {
            logger.debug(message, Some("llm"), None);
        }
    }

    fn log_error(&self, message: &str) {
        if let Some(logger) = &self.logger {
            logger.error(message, Some("llm"), None);
        }
    }
}

impl CompletionClient<OpenAiCompletionProvider> {
    /// Convenience constructor wiring the OpenAI-compatible provider from a
    /// [`CheckerConfig`].
    pub fn from_config(
        config: &CheckerConfig,
        logger: Option<Arc<CheckerLogger>>,
        metrics_callback: Option<MetricsCallback>,
    ) -> Result<Self, LlmError> {
        let provider = OpenAiCompletionProvider::from_config(config)?;
        Ok(CompletionClient::new(config.model_name.as_str(), provider)
            .with_logger(logger)
            .with_metrics_callback(metrics_callback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_openai::error::{ApiError, OpenAIError};
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Mutex;

    #[derive(Debug, Default)]
    struct RecordingProvider {
        requests: Mutex<Vec<CreateChatCompletionRequest>>,
        response: Mutex<Option<Result<CreateChatCompletionResponse, OpenAIError>>>,
    }

    impl RecordingProvider {
        fn with_response(response: CreateChatCompletionResponse) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                response: Mutex::new(Some(Ok(response))),
            }
        }

        fn with_error(error: OpenAIError) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                response: Mutex::new(Some(Err(error))),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for RecordingProvider {
        async fn complete(
            &self,
            request: CreateChatCompletionRequest,
        ) -> Result<CreateChatCompletionResponse, OpenAIError> {
            self.requests.lock().await.push(request);
            self.response.lock().await.take().unwrap_or_else(|| {
                Err(OpenAIError::ApiError(ApiError {
                    message: "no response configured".into(),
                    r#type: None,
                    param: None,
                    code: None,
                }))
            })
        }
    }

    fn sample_response(content: &str) -> CreateChatCompletionResponse {
        serde_json::from_value(json!({
            "id": "cmpl-test",
            "object": "chat.completion",
            "created": 0,
            "model": "claude-3-5-haiku-20241022",
            "choices": [{
                "index": 0,
                "finish_reason": "stop",
                "message": {
                    "role": "assistant",
                    "content": content
                },
                "logprobs": null
            }],
            "usage": {
                "prompt_tokens": 120,
                "completion_tokens": 40,
                "total_tokens": 160
            },
            "system_fingerprint": null
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn build_request_uses_default_model_and_token_bound() {
        let provider = RecordingProvider::default();
        let client = CompletionClient::new("claude-3-5-haiku-20241022", provider);

        let options = CompletionOptions {
            max_tokens: Some(8_192),
            ..CompletionOptions::default()
        };
        let request = client.build_request("extract things", &options).expect("build");

        assert_eq!(request.model, "claude-3-5-haiku-20241022");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.max_completion_tokens, Some(8_192));
    }

    #[tokio::test]
    async fn empty_default_model_is_rejected() {
        let provider = RecordingProvider::default();
        let client = CompletionClient::new("", provider);

        let err = client
            .build_request("prompt", &CompletionOptions::default())
            .expect_err("should reject");
        assert!(matches!(err, LlmError::MissingDefaultModel));
    }

    #[tokio::test]
    async fn complete_text_returns_first_choice_content() {
        let provider = RecordingProvider::with_response(sample_response("{\"ok\": true}"));
        let client = CompletionClient::new("claude-3-5-haiku-20241022", provider);

        let text = client
            .complete_text("prompt", &CompletionOptions::default(), "extract")
            .await
            .expect("completion");
        assert_eq!(text, "{\"ok\": true}");
    }

    #[tokio::test]
    async fn blank_completion_is_an_error() {
        let provider = RecordingProvider::with_response(sample_response("   "));
        let client = CompletionClient::new("claude-3-5-haiku-20241022", provider);

        let err = client
            .complete_text("prompt", &CompletionOptions::default(), "extract")
            .await
            .expect_err("should reject blank content");
        assert!(matches!(err, LlmError::EmptyCompletion));
    }

    #[tokio::test]
    async fn metrics_callback_receives_duration_and_operation() {
        let provider = RecordingProvider::with_response(sample_response("{}"));
        let invocations: Arc<std::sync::Mutex<Vec<(String, Duration, u64)>>> =
            Arc::new(std::sync::Mutex::new(Vec::new()));
        let capture = Arc::clone(&invocations);

        let client = CompletionClient::new("claude-3-5-haiku-20241022", provider)
            .with_metrics_callback(Some(Arc::new(move |response, duration, operation| {
                let prompt_tokens = response
                    .usage
                    .as_ref()
                    .map(|usage| u64::from(usage.prompt_tokens))
                    .unwrap_or_default();
                capture
                    .lock()
                    .unwrap()
                    .push((operation.to_string(), duration, prompt_tokens));
            })));

        client
            .complete_text("prompt", &CompletionOptions::default(), "extract")
            .await
            .expect("completion succeeds");

        let calls = invocations.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "extract");
        assert_eq!(calls[0].2, 120);
    }

    #[tokio::test]
    async fn propagates_provider_error() {
        let expected_message = "rate limited".to_string();
        let provider = RecordingProvider::with_error(OpenAIError::ApiError(ApiError {
            message: expected_message.clone(),
            r#type: None,
            param: None,
            code: None,
        }));
        let client = CompletionClient::new("claude-3-5-haiku-20241022", provider);

        let err = client
            .complete_text("prompt", &CompletionOptions::default(), "extract")
            .await
            .expect_err("should propagate error");

        match err {
            LlmError::OpenAi(OpenAIError::ApiError(api_err)) => {
                assert_eq!(api_err.message, expected_message);
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }
}
