use std::io;
use thiserror::Error;
use async_openai::error::OpenAIError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Custom result type alias for the application
pub type Result<T> = std::result::Result<T, ReadmeError>;

/// Errors that can occur while generating a README
#[derive(Debug, Error)]
pub enum ReadmeError {
    /// I/O errors
    #[error("IO error: {0}")]
    IO(#[from] io::Error),

    /// HTTP request/response errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing/serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ZIP archive errors
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Directory traversal errors
    #[error("Walkdir error: {0}")]
    Walkdir(#[from] walkdir::Error),

    /// URL parsing errors
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Malformed repository location or unknown generation method
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Network connectivity errors
    #[error("Network error: {0}")]
    Network(String),

    /// API rate limit exceeded errors
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// LLM or embedding backend unreachable, misconfigured, or returning an error
    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    /// Prompt exceeded the backend's context window
    #[error("Context length exceeded: {0}")]
    ContextOverflow(String),

    /// Repository fetch or cleanup errors
    #[error("Filesystem error: {0}")]
    Filesystem(String),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// General message errors
    #[error("{0}")]
    Message(String),
}

/// Coarse classification of a [`ReadmeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any resource use
    InvalidInput,
    /// LLM, embedding, or hosting backend failure
    UpstreamUnavailable,
    /// Prompt too large for the backend
    ContextOverflow,
    /// Fetch, extraction, write, or cleanup failure
    Filesystem,
    /// Anything else
    Internal,
}

impl ReadmeError {
    /// Creates a new error with the specified message
    pub fn new(message: &str) -> Self {
        Self::Message(message.to_string())
    }

    /// Returns the taxonomy bucket this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) | Self::UrlParse(_) => ErrorKind::InvalidInput,
            Self::Http(_)
            | Self::Json(_)
            | Self::Network(_)
            | Self::RateLimitExceeded(_)
            | Self::Upstream(_) => ErrorKind::UpstreamUnavailable,
            Self::ContextOverflow(_) => ErrorKind::ContextOverflow,
            Self::IO(_) | Self::Zip(_) | Self::Walkdir(_) | Self::Filesystem(_) => {
                ErrorKind::Filesystem
            }
            Self::Config(_) | Self::Message(_) => ErrorKind::Internal,
        }
    }

    /// Checks if this error is transient and retryable
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Http(_) | Self::RateLimitExceeded(_)
        )
    }

    /// Checks if the backend rejected the prompt for its size
    pub fn is_context_overflow(&self) -> bool {
        matches!(self, Self::ContextOverflow(_))
    }
}

impl From<OpenAIError> for ReadmeError {
    fn from(err: OpenAIError) -> Self {
        match err {
            OpenAIError::ApiError(api) => ApiFailure {
                message: api.message,
                code: api.code,
                kind: api.r#type,
            }
            .classify(None),
            OpenAIError::Reqwest(e) => Self::Network(e.to_string()),
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl ReadmeError {
    /// Classifies a non-success response from an OpenAI-compatible endpoint.
    ///
    /// Reads OpenAI's `{"error": {...}}` body as well as Gemini's
    /// `[{"error": {"code": 400, "status": "INVALID_ARGUMENT", ...}}]`.
    pub fn from_api_response(status: u16, body: &str) -> Self {
        ApiFailure::parse(body).classify(Some(status))
    }
}

/// The fields of a backend error body that drive classification
#[derive(Debug, Default)]
struct ApiFailure {
    message: String,
    code: Option<String>,
    kind: Option<String>,
}

impl ApiFailure {
    fn parse(body: &str) -> Self {
        let value: Value = serde_json::from_str(body).unwrap_or(Value::Null);
        let value = match value {
            Value::Array(items) => items.into_iter().next().unwrap_or(Value::Null),
            other => other,
        };
        let error = value.get("error").unwrap_or(&value);

        let text = |field: &str| match error.get(field) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        Self {
            message: text("message").unwrap_or_else(|| body.trim().chars().take(500).collect()),
            code: text("code"),
            kind: text("type").or_else(|| text("status")),
        }
    }

    fn classify(self, status: Option<u16>) -> ReadmeError {
        let code = self.code.as_deref().unwrap_or_default();
        let kind = self.kind.as_deref().unwrap_or_default();
        let message = match status {
            Some(status) => format!("HTTP {}: {}", status, self.message),
            None => self.message.clone(),
        };

        if code == "context_length_exceeded" || mentions_context_limit(&self.message) {
            ReadmeError::ContextOverflow(message)
        } else if code == "insufficient_quota" || kind == "insufficient_quota" {
            ReadmeError::Upstream(message)
        } else if status == Some(429)
            || code == "rate_limit_exceeded"
            || kind == "rate_limit_exceeded"
            || kind == "RESOURCE_EXHAUSTED"
        {
            ReadmeError::RateLimitExceeded(message)
        } else if status.map_or(false, |s| s >= 500) {
            ReadmeError::Network(message)
        } else {
            ReadmeError::Upstream(message)
        }
    }
}

/// Backends word their context-window errors differently; match the common phrasings.
static CONTEXT_LIMIT: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)context (length|window)|token count .* exceeds|too many tokens").ok()
});

fn mentions_context_limit(message: &str) -> bool {
    CONTEXT_LIMIT
        .as_ref()
        .map(|re| re.is_match(message))
        .unwrap_or(false)
}
