use std::time::Duration;

use crate::config::LlmSettings;
use crate::error::{ReadmeError, Result};
use crate::utils::{with_retry, RetryPolicy};
use super::types::{AssistantMessage, GenerationParams, LlmResponse};
use super::{Embedder, LanguageModel};
use async_openai::types::{
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    CreateChatCompletionResponse, CreateEmbeddingRequestArgs, CreateEmbeddingResponse,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

const CONNECT_TIMEOUT_SECS: u64 = 30;
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Chat and embedding client for any OpenAI-compatible API (OpenAI, Gemini).
///
/// Each call is a single HTTP request; the only retries are those of the
/// configured [`RetryPolicy`].
pub struct OpenAiBackend {
    http: Client,
    api_base: String,
    api_key: String,
    model: String,
    embedding_model: String,
    params: GenerationParams,
    retry: RetryPolicy,
}

impl OpenAiBackend {
    /// Creates a backend from settings; fails when no API key is configured
    pub fn new(settings: &LlmSettings, retry: RetryPolicy) -> Result<Self> {
        let api_key = settings.require_api_key()?.to_string();
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ReadmeError::Network(e.to_string()))?;

        info!(
            provider = ?settings.provider,
            model = settings.model(),
            embedding_model = settings.embedding_model(),
            max_retries = retry.max_retries,
            "LLM backend configured"
        );

        Ok(Self {
            http,
            api_base: settings.api_base().trim_end_matches('/').to_string(),
            api_key,
            model: settings.model().to_string(),
            embedding_model: settings.embedding_model().to_string(),
            params: GenerationParams {
                max_tokens: settings.max_tokens,
                temperature: settings.temperature,
            },
            retry,
        })
    }

    /// Chat model identifier
    pub fn model(&self) -> &str {
        &self.model
    }

    /// POSTs `body` to `path` under the API base; non-success statuses are classified from the body
    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.api_base, path);
        debug!(url = %url, "backend request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ReadmeError::Network(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ReadmeError::Network(e.to_string()))?;

        if !status.is_success() {
            let err = ReadmeError::from_api_response(status.as_u16(), &String::from_utf8_lossy(&bytes));
            warn!(url = %url, status = status.as_u16(), "backend request failed: {}", err);
            return Err(err);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn chat(&self, prompt: &str) -> Result<LlmResponse> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()?;
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![message.into()])
            .max_completion_tokens(self.params.max_tokens)
            .temperature(self.params.temperature)
            .build()?;

        let response: CreateChatCompletionResponse = self.post("/chat/completions", &request).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ReadmeError::Upstream("completion returned no choices".into()))?;

        if choice.message.content.is_none() {
            warn!(finish_reason = ?choice.finish_reason, "completion carried no text");
        }

        Ok(LlmResponse::Message(AssistantMessage {
            role: "assistant".to_string(),
            content: choice.message.content,
        }))
    }

    async fn embeddings(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.embedding_model)
            .input(inputs.to_vec())
            .build()?;

        let response: CreateEmbeddingResponse = self.post("/embeddings", &request).await?;
        let mut data = response.data;
        if data.len() != inputs.len() {
            return Err(ReadmeError::Upstream(format!(
                "expected {} embeddings, received {}",
                inputs.len(),
                data.len()
            )));
        }
        data.sort_by_key(|embedding| embedding.index);
        Ok(data.into_iter().map(|embedding| embedding.embedding).collect())
    }
}

#[async_trait]
impl LanguageModel for OpenAiBackend {
    async fn invoke(&self, prompt: &str) -> Result<LlmResponse> {
        with_retry(&self.retry, "chat completion", || self.chat(prompt)).await
    }
}

#[async_trait]
impl Embedder for OpenAiBackend {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        with_retry(&self.retry, "embedding", || self.embeddings(inputs)).await
    }
}
