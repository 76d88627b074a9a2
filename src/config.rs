//! Strongly-typed configuration for the altscan pipeline.
//!
//! Everything the Stabilizer, prompt assembly, and completion client need is
//! carried in an explicit [`CheckerConfig`] value rather than process-global
//! state, so test doubles can be wired in without touching the environment.
//! Values can be constructed from defaults, loaded from environment variables
//! (with optional `.env` support), or merged with explicit overrides.

use std::env;
use std::fmt;
use std::num::ParseIntError;
use std::path::PathBuf;

use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::{LogCallback, Verbosity};

/// Model used when nothing else is configured.
pub const DEFAULT_MODEL: ModelName = ModelName::Claude35Haiku;

/// Default HTML truncation budget handed to prompt assembly, in bytes.
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 200_000;

/// Default upper bound on completion output tokens.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8_192;

/// Default pause between a scroll command and the next height read.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2_000;

/// Default cap on scroll-stabilization rounds.
pub const DEFAULT_MAX_SCROLL_ROUNDS: u32 = 20;

/// Default wall-clock budget for the whole stabilization loop.
pub const DEFAULT_STABILIZE_TIMEOUT_MS: u64 = 120_000;

/// Prompt template the pipeline runs with. A configuration switch, not a
/// runtime decision: the extractor validates against the same variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateVariant {
    /// xpath + description only.
    Plain,
    /// Adds the six-situation taxonomy, judgments, and success techniques.
    Classified,
}

impl Default for TemplateVariant {
    fn default() -> Self {
        TemplateVariant::Plain
    }
}

impl TemplateVariant {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "plain" => Some(TemplateVariant::Plain),
            "classified" => Some(TemplateVariant::Classified),
            _ => None,
        }
    }
}

/// Completion models the checker knows how to name.
///
/// The pipeline only needs plain text generation, so any entry here (or a
/// lower-capability stand-in reachable through `model_base_url`) works as
/// long as it can emit JSON-shaped text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelName {
    #[serde(rename = "claude-3-5-haiku-20241022")]
    Claude35Haiku,
    #[serde(rename = "claude-3-5-sonnet-latest")]
    Claude35SonnetLatest,
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
}

impl Default for ModelName {
    fn default() -> Self {
        DEFAULT_MODEL
    }
}

impl ModelName {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelName::Claude35Haiku => "claude-3-5-haiku-20241022",
            ModelName::Claude35SonnetLatest => "claude-3-5-sonnet-latest",
            ModelName::Gpt4o => "gpt-4o",
            ModelName::Gpt4oMini => "gpt-4o-mini",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "claude-3-5-haiku-20241022" => Some(ModelName::Claude35Haiku),
            "claude-3-5-sonnet-latest" => Some(ModelName::Claude35SonnetLatest),
            "gpt-4o" => Some(ModelName::Gpt4o),
            "gpt-4o-mini" => Some(ModelName::Gpt4oMini),
            _ => None,
        }
    }
}

/// Configuration values for one checker invocation.
#[derive(Clone)]
pub struct CheckerConfig {
    /// Local browser binary; `None` lets chromiumoxide auto-detect.
    pub chrome_executable: Option<PathBuf>,
    pub headless: bool,
    pub disable_gpu: bool,
    pub no_sandbox: bool,
    pub disable_dev_shm: bool,
    /// Extra launch arguments appended verbatim.
    pub extra_browser_args: Vec<String>,
    pub settle_delay_ms: u64,
    pub max_scroll_rounds: u32,
    pub stabilize_timeout_ms: u64,
    pub model_name: ModelName,
    pub model_api_key: Option<String>,
    /// OpenAI-compatible endpoint override.
    pub model_base_url: Option<String>,
    pub max_output_tokens: u32,
    pub max_content_length: usize,
    pub template: TemplateVariant,
    pub verbose: Verbosity,
    pub logger: Option<LogCallback>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        CheckerConfig {
            chrome_executable: None,
            headless: true,
            disable_gpu: true,
            no_sandbox: true,
            disable_dev_shm: true,
            extra_browser_args: Vec::new(),
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            max_scroll_rounds: DEFAULT_MAX_SCROLL_ROUNDS,
            stabilize_timeout_ms: DEFAULT_STABILIZE_TIMEOUT_MS,
            model_name: ModelName::default(),
            model_api_key: None,
            model_base_url: None,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            template: TemplateVariant::default(),
            verbose: Verbosity::default(),
            logger: None,
        }
    }
}

impl CheckerConfig {
    /// Construct a configuration by reading relevant environment variables,
    /// after loading a `.env` file if present.
    pub fn from_env() -> Result<Self, CheckerConfigError> {
        let _ = dotenv();
        let mut config = CheckerConfig::default();

        if let Some(value) = env_var("ALTSCAN_CHROME_BIN") {
            config.chrome_executable = Some(PathBuf::from(value));
        }

        if let Some(value) = env_var("ALTSCAN_HEADLESS") {
            config.headless = parse_bool("ALTSCAN_HEADLESS", &value)?;
        }

        if let Some(value) = env_var("ALTSCAN_DISABLE_GPU") {
            config.disable_gpu = parse_bool("ALTSCAN_DISABLE_GPU", &value)?;
        }

        if let Some(value) = env_var("ALTSCAN_NO_SANDBOX") {
            config.no_sandbox = parse_bool("ALTSCAN_NO_SANDBOX", &value)?;
        }

        if let Some(value) = env_var("ALTSCAN_DISABLE_DEV_SHM") {
            config.disable_dev_shm = parse_bool("ALTSCAN_DISABLE_DEV_SHM", &value)?;
        }

        if let Some(value) = env_var("ALTSCAN_BROWSER_ARGS") {
            config.extra_browser_args = value.split_whitespace().map(str::to_string).collect();
        }

        if let Some(value) = env_var("ALTSCAN_SETTLE_DELAY_MS") {
            config.settle_delay_ms = parse_u64("ALTSCAN_SETTLE_DELAY_MS", &value)?;
        }

        if let Some(value) = env_var("ALTSCAN_MAX_SCROLL_ROUNDS") {
            config.max_scroll_rounds = parse_u32("ALTSCAN_MAX_SCROLL_ROUNDS", &value)?;
        }

        if let Some(value) = env_var("ALTSCAN_STABILIZE_TIMEOUT_MS") {
            config.stabilize_timeout_ms = parse_u64("ALTSCAN_STABILIZE_TIMEOUT_MS", &value)?;
        }

        if let Some(value) = env_var("MODEL_NAME") {
            config.model_name = ModelName::parse(&value)
                .ok_or_else(|| CheckerConfigError::invalid_enum("MODEL_NAME", value.clone()))?;
        }

        if let Some(value) = env_var("MODEL_API_KEY")
            .or_else(|| env_var("OPENAI_API_KEY"))
            .or_else(|| env_var("ANTHROPIC_API_KEY"))
        {
            config.model_api_key = Some(value);
        }

        if let Some(value) = env_var("MODEL_BASE_URL") {
            config.model_base_url = Some(value);
        }

        if let Some(value) = env_var("ALTSCAN_MAX_OUTPUT_TOKENS") {
            config.max_output_tokens = parse_u32("ALTSCAN_MAX_OUTPUT_TOKENS", &value)?;
        }

        if let Some(value) = env_var("ALTSCAN_MAX_CONTENT_LENGTH") {
            config.max_content_length = parse_u64("ALTSCAN_MAX_CONTENT_LENGTH", &value)? as usize;
        }

        if let Some(value) = env_var("ALTSCAN_TEMPLATE") {
            config.template = TemplateVariant::parse(&value).ok_or_else(|| {
                CheckerConfigError::invalid_enum("ALTSCAN_TEMPLATE", value.clone())
            })?;
        }

        if let Some(value) = env_var("ALTSCAN_VERBOSE") {
            let parsed = parse_u32("ALTSCAN_VERBOSE", &value)? as u8;
            config.verbose = Verbosity::from_u8(parsed).ok_or_else(|| {
                CheckerConfigError::invalid_enum("ALTSCAN_VERBOSE", parsed.to_string())
            })?;
        }

        Ok(config)
    }

    /// Create a new configuration with explicit field overrides applied.
    pub fn with_overrides(&self, overrides: CheckerConfigOverrides) -> CheckerConfig {
        let mut next = self.clone();

        if let Some(value) = overrides.chrome_executable {
            next.chrome_executable = value;
        }
        if let Some(value) = overrides.headless {
            next.headless = value;
        }
        if let Some(value) = overrides.disable_gpu {
            next.disable_gpu = value;
        }
        if let Some(value) = overrides.no_sandbox {
            next.no_sandbox = value;
        }
        if let Some(value) = overrides.disable_dev_shm {
            next.disable_dev_shm = value;
        }
        if let Some(value) = overrides.extra_browser_args {
            next.extra_browser_args = value;
        }
        if let Some(value) = overrides.settle_delay_ms {
            next.settle_delay_ms = value;
        }
        if let Some(value) = overrides.max_scroll_rounds {
            next.max_scroll_rounds = value;
        }
        if let Some(value) = overrides.stabilize_timeout_ms {
            next.stabilize_timeout_ms = value;
        }
        if let Some(value) = overrides.model_name {
            next.model_name = value;
        }
        if let Some(value) = overrides.model_api_key {
            next.model_api_key = value;
        }
        if let Some(value) = overrides.model_base_url {
            next.model_base_url = value;
        }
        if let Some(value) = overrides.max_output_tokens {
            next.max_output_tokens = value;
        }
        if let Some(value) = overrides.max_content_length {
            next.max_content_length = value;
        }
        if let Some(value) = overrides.template {
            next.template = value;
        }
        if let Some(value) = overrides.verbose {
            next.verbose = value;
        }
        if let Some(value) = overrides.logger {
            next.logger = value;
        }

        next
    }
}

/// Field-level overrides for [`CheckerConfig::with_overrides`]. Optional
/// fields use `Option<Option<T>>` so a value can be cleared, not just set.
#[derive(Default, Clone)]
pub struct CheckerConfigOverrides {
    pub chrome_executable: Option<Option<PathBuf>>,
    pub headless: Option<bool>,
    pub disable_gpu: Option<bool>,
    pub no_sandbox: Option<bool>,
    pub disable_dev_shm: Option<bool>,
    pub extra_browser_args: Option<Vec<String>>,
    pub settle_delay_ms: Option<u64>,
    pub max_scroll_rounds: Option<u32>,
    pub stabilize_timeout_ms: Option<u64>,
    pub model_name: Option<ModelName>,
    pub model_api_key: Option<Option<String>>,
    pub model_base_url: Option<Option<String>>,
    pub max_output_tokens: Option<u32>,
    pub max_content_length: Option<usize>,
    pub template: Option<TemplateVariant>,
    pub verbose: Option<Verbosity>,
    pub logger: Option<Option<LogCallback>>,
}

impl fmt::Debug for CheckerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckerConfig")
            .field("chrome_executable", &self.chrome_executable)
            .field("headless", &self.headless)
            .field("disable_gpu", &self.disable_gpu)
            .field("no_sandbox", &self.no_sandbox)
            .field("disable_dev_shm", &self.disable_dev_shm)
            .field("extra_browser_args", &self.extra_browser_args)
            .field("settle_delay_ms", &self.settle_delay_ms)
            .field("max_scroll_rounds", &self.max_scroll_rounds)
            .field("stabilize_timeout_ms", &self.stabilize_timeout_ms)
            .field("model_name", &self.model_name)
            .field("model_api_key_present", &self.model_api_key.is_some())
            .field("model_base_url", &self.model_base_url)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("max_content_length", &self.max_content_length)
            .field("template", &self.template)
            .field("verbose", &self.verbose)
            .field("logger_present", &self.logger.is_some())
            .finish()
    }
}

/// Errors that can arise while constructing a [`CheckerConfig`].
#[derive(Debug, Error)]
pub enum CheckerConfigError {
    #[error("invalid value '{value}' for {field}")]
    InvalidEnumVariant { field: &'static str, value: String },
    #[error("invalid boolean '{value}' for {field}")]
    InvalidBool { field: &'static str, value: String },
    #[error("invalid number '{value}' for {field}: {source}")]
    InvalidNumber {
        field: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

impl CheckerConfigError {
    fn invalid_enum(field: &'static str, value: String) -> Self {
        CheckerConfigError::InvalidEnumVariant { field, value }
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_bool(field: &'static str, value: &str) -> Result<bool, CheckerConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CheckerConfigError::InvalidBool {
            field,
            value: value.to_string(),
        }),
    }
}

fn parse_u32(field: &'static str, value: &str) -> Result<u32, CheckerConfigError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|source| CheckerConfigError::InvalidNumber {
            field,
            value: value.to_string(),
            source,
        })
}

fn parse_u64(field: &'static str, value: &str) -> Result<u64, CheckerConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|source| CheckerConfigError::InvalidNumber {
            field,
            value: value.to_string(),
            source,
        })
}
