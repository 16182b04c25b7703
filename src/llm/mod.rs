//! Language-model and embedding backends.
//!
//! The pipeline depends only on the [`LanguageModel`] and [`Embedder`] traits.
//! Every completion passes through [`complete`], the single place where a
//! backend's response shape is normalized to text.

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;

/// OpenAI-compatible backend
pub mod client;
/// Response shapes and generation parameters
pub mod types;

pub use client::OpenAiBackend;
pub use types::{AssistantMessage, GenerationParams, LlmResponse};

/// A text-completion backend
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Sends one prompt and returns the backend's raw response
    async fn invoke(&self, prompt: &str) -> Result<LlmResponse>;
}

/// A text-embedding backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds every input, returning one vector per input in the same order
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Invokes the model and normalizes its answer to trimmed text
pub async fn complete(model: &dyn LanguageModel, prompt: &str) -> Result<String> {
    let response = model.invoke(prompt).await?;
    let text = response.into_text();
    debug!(prompt_chars = prompt.chars().count(), reply_chars = text.chars().count(), "llm call");
    Ok(text)
}
