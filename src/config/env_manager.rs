use serde::{Deserialize, Serialize};

/// Which OpenAI-compatible backend the credentials belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Google Gemini through its OpenAI-compatible endpoint
    #[default]
    Gemini,
    /// OpenAI
    OpenAi,
}

impl Provider {
    /// Base URL of the provider's OpenAI-compatible API
    pub fn default_api_base(self) -> &'static str {
        match self {
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
            Provider::OpenAi => "https://api.openai.com/v1",
        }
    }

    /// Chat model used when none is configured
    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-2.0-flash",
            Provider::OpenAi => "gpt-4o-mini",
        }
    }

    /// Embedding model used when none is configured
    pub fn default_embedding_model(self) -> &'static str {
        match self {
            Provider::Gemini => "text-embedding-004",
            Provider::OpenAi => "text-embedding-3-small",
        }
    }
}

/// Stores API keys for the services the generator talks to
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeys {
    /// Gemini API key
    pub gemini: Option<String>,
    /// OpenAI API key
    pub openai: Option<String>,
    /// GitHub token for authenticated archive downloads
    pub github_token: Option<String>,
}

impl ApiKeys {
    /// Loads API keys from the environment
    pub fn from_env() -> Self {
        Self {
            gemini: get_env_value("GEMINI_API_KEY"),
            openai: get_env_value("OPENAI_API_KEY"),
            github_token: get_env_value("GITHUB_TOKEN"),
        }
    }

    /// The provider and key to use; Gemini wins when both are present
    pub fn llm_credential(&self) -> Option<(Provider, String)> {
        self.gemini
            .clone()
            .map(|key| (Provider::Gemini, key))
            .or_else(|| self.openai.clone().map(|key| (Provider::OpenAi, key)))
    }
}

/// Reads an environment variable, treating empty values as unset
pub fn get_env_value(key: &str) -> Option<String> {
    let value = std::env::var(key).ok()?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
