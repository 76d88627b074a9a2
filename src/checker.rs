//! High-level facade composing the full pipeline.
//!
//! One `check` call is strictly sequential: stabilize the page, truncate the
//! markup to the prompt budget, assemble the template, make one completion
//! call, and run one extraction pass. Nothing is retried here; re-fetching on
//! a navigation failure or re-prompting on a malformed payload is a caller
//! decision, since blind retries against a paid model call are costly.

use std::sync::{Arc, Mutex};

use serde_json::json;
use thiserror::Error;
use tokio::time::Instant;

use crate::browser::BrowserRuntime;
use crate::config::CheckerConfig;
use crate::extract::{ExtractionFailure, extract_findings};
use crate::llm::{
    CompletionClient, CompletionOptions, CompletionProvider, LlmError, MetricsCallback,
    OpenAiCompletionProvider,
    prompts::{build_extraction_prompt, truncate_html},
};
use crate::logging::{CheckerLogger, LogConfig};
use crate::metrics::CheckerMetrics;
use crate::runtime::ChromiumRuntime;
use crate::stabilize::{StabilizeError, Stabilizer};
use crate::types::{CheckReport, PageSummary};

/// Errors surfaced by [`NonTextChecker::check`]. The extractor's typed
/// failures become errors only at this boundary, for the CLI to report.
#[derive(Debug, Error)]
pub enum CheckerError {
    #[error(transparent)]
    Stabilize(#[from] StabilizeError),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Extraction(#[from] ExtractionFailure),
}

/// Drives a browser runtime and a completion provider through one
/// stabilize → prompt → complete → extract pass per invocation.
pub struct NonTextChecker<R: BrowserRuntime, P: CompletionProvider> {
    config: CheckerConfig,
    stabilizer: Stabilizer<R>,
    llm: CompletionClient<P>,
    logger: Arc<CheckerLogger>,
    metrics: Arc<Mutex<CheckerMetrics>>,
}

impl NonTextChecker<ChromiumRuntime, OpenAiCompletionProvider> {
    /// Wire the default chromiumoxide runtime and an OpenAI-compatible
    /// provider from configuration.
    pub fn with_chromium(config: CheckerConfig) -> Result<Self, LlmError> {
        let provider = OpenAiCompletionProvider::from_config(&config)?;
        Ok(Self::new(config, ChromiumRuntime::new(), provider))
    }
}

impl<R, P> NonTextChecker<R, P>
where
    R: BrowserRuntime,
    P: CompletionProvider,
{
    pub fn new(config: CheckerConfig, runtime: R, provider: P) -> Self {
        let logger = Arc::new(CheckerLogger::with_config(LogConfig {
            verbose: config.verbose,
            external_logger: config.logger.clone(),
        }));

        let metrics = Arc::new(Mutex::new(CheckerMetrics::default()));
        let metrics_sink = Arc::clone(&metrics);
        let metrics_callback: MetricsCallback =
            Arc::new(move |response, elapsed, _operation| {
                if let Some(usage) = response.usage.as_ref() {
                    if let Ok(mut metrics) = metrics_sink.lock() {
                        metrics.record_completion(
                            u64::from(usage.prompt_tokens),
                            u64::from(usage.completion_tokens),
                            elapsed.as_millis() as u64,
                        );
                    }
                }
            });

        let llm = CompletionClient::new(config.model_name.as_str(), provider)
            .with_logger(Some(Arc::clone(&logger)))
            .with_metrics_callback(Some(metrics_callback));

        let stabilizer = Stabilizer::new(&config, runtime, Arc::clone(&logger));

        Self {
            config,
            stabilizer,
            llm,
            logger,
            metrics,
        }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    pub fn logger(&self) -> &Arc<CheckerLogger> {
        &self.logger
    }

    /// Snapshot of the metrics accumulated so far.
    pub fn metrics(&self) -> CheckerMetrics {
        self.metrics
            .lock()
            .map(|metrics| metrics.clone())
            .unwrap_or_default()
    }

    /// Run the full pipeline against one URL.
    pub async fn check(&self, url: &str) -> Result<CheckReport, CheckerError> {
        let stabilize_started = Instant::now();
        let page = self.stabilizer.fetch(url).await?;
        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.record_stabilization(
                u64::from(page.rounds),
                stabilize_started.elapsed().as_millis() as u64,
            );
        }

        let (content, truncated) = truncate_html(&page.html, self.config.max_content_length);
        if truncated {
            self.logger.info(
                format!(
                    "Markup cut from {} to {} bytes for the prompt budget",
                    page.html.len(),
                    content.len()
                ),
                Some("prompt"),
                None,
            );
        }

        let prompt = build_extraction_prompt(content, self.config.template);
        let options = CompletionOptions {
            max_tokens: Some(self.config.max_output_tokens),
            ..CompletionOptions::default()
        };

        let response = self.llm.complete_text(&prompt, &options, "extract").await?;
        self.logger.debug(
            "Raw model response",
            Some("extract"),
            Some(json!({ "response": response.clone() })),
        );

        let report = match extract_findings(&response, self.config.template) {
            Ok(report) => report,
            Err(failure) => {
                if let ExtractionFailure::MalformedPayload { candidate, .. } = &failure {
                    self.logger.error(
                        "Model payload did not parse after repair",
                        Some("extract"),
                        Some(json!({ "candidate": candidate })),
                    );
                }
                return Err(failure.into());
            }
        };

        self.logger.info(
            format!("Extracted {} finding(s)", report.len()),
            Some("extract"),
            None,
        );

        Ok(CheckReport {
            url: url.to_string(),
            page: PageSummary {
                html_bytes: page.html.len(),
                truncated,
                rounds: page.rounds,
                outcome: page.outcome,
            },
            report,
            metrics: self.metrics(),
        })
    }
}
