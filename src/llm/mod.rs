//! Language-model client layer.
//!
//! Houses the provider-agnostic completion interface, an implementation for
//! OpenAI-compatible endpoints powered by the `async-openai` crate, and the
//! prompt templates that bind a rendered page into an extraction request.

pub mod client;
pub mod error;
pub mod openai;
pub mod prompts;
pub mod provider;

pub use client::{CompletionClient, CompletionOptions, MetricsCallback};
pub use error::LlmError;
pub use openai::OpenAiCompletionProvider;
pub use provider::CompletionProvider;
