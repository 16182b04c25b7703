use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A chat message returned by a backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    /// Message role, normally "assistant"
    pub role: String,
    /// Message text; absent for refusals or tool-only replies
    pub content: Option<String>,
}

/// Every shape a backend may answer with.
///
/// Pipeline code never inspects this directly; it goes through
/// [`LlmResponse::into_text`] (via [`crate::llm::complete`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LlmResponse {
    /// Structured chat message
    Message(AssistantMessage),
    /// Chain-style mapping carrying an `output_text` field
    Mapping(Map<String, Value>),
    /// Plain string
    Raw(String),
}

impl LlmResponse {
    /// Builds a message-shaped response
    pub fn message(content: impl Into<String>) -> Self {
        Self::Message(AssistantMessage {
            role: "assistant".to_string(),
            content: Some(content.into()),
        })
    }

    /// Builds a mapping-shaped response with an `output_text` field
    pub fn output_text(text: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert("output_text".to_string(), Value::String(text.into()));
        Self::Mapping(map)
    }

    /// Normalizes any response shape to trimmed plain text
    pub fn into_text(self) -> String {
        match self {
            Self::Message(message) => message.content.unwrap_or_default().trim().to_string(),
            Self::Mapping(map) => match map.get("output_text") {
                Some(Value::String(text)) => text.trim().to_string(),
                _ => Value::Object(map).to_string().trim().to_string(),
            },
            Self::Raw(text) => text.trim().to_string(),
        }
    }
}

impl From<String> for LlmResponse {
    fn from(text: String) -> Self {
        Self::Raw(text)
    }
}

impl From<&str> for LlmResponse {
    fn from(text: &str) -> Self {
        Self::Raw(text.to_string())
    }
}

/// Output limits for a single completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    /// Maximum output tokens
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 2000,
            temperature: 0.4,
        }
    }
}
