mod env_manager;

use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::{ReadmeError, Result};
use crate::utils::RetryPolicy;

pub use env_manager::{get_env_value, ApiKeys, Provider};

/// Main configuration struct for the application
///
/// Built once at process start and shared by reference (`Arc<Config>`);
/// no component reads the environment after that.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM and embedding backend settings
    pub llm: LlmSettings,
    /// Chunking, condensation and retrieval sizes
    pub pipeline: PipelineSettings,
    /// Retry policy for transient upstream failures
    pub retry: RetryPolicy,
    /// HTTP server settings
    pub server: ServerSettings,
    /// Filesystem locations
    pub paths: PathSettings,
    /// GitHub token used for archive downloads
    #[serde(skip_serializing)]
    pub github_token: Option<String>,
}

/// Settings for the OpenAI-compatible backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Backend the credential belongs to
    pub provider: Provider,
    /// API credential; required for the real backend
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Override for the API base URL
    pub api_base: Option<String>,
    /// Override for the chat model identifier
    pub model: Option<String>,
    /// Override for the embedding model identifier
    pub embedding_model: Option<String>,
    /// Maximum output tokens per completion
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

/// Sizes and thresholds of the summarization pipeline, in characters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Maximum corpus chunk size
    pub chunk_size: usize,
    /// Overlap between consecutive corpus chunks
    pub chunk_overlap: usize,
    /// Maximum text handed to a single combine prompt
    pub reduce_budget: usize,
    /// Maximum number of reduce rounds before a forced final combine
    pub max_reduce_depth: usize,
    /// Map calls in flight at once
    pub map_concurrency: usize,
    /// Summaries longer than this are condensed before README composition
    pub condense_threshold: usize,
    /// Chunk size of the condensation pass
    pub condense_chunk_size: usize,
    /// Overlap of the condensation pass
    pub condense_chunk_overlap: usize,
    /// Summaries at least this long are condensed before example search
    pub search_condense_threshold: usize,
    /// Input budget of the ultra-condense fallback
    pub ultra_condense_budget: usize,
    /// Word limit requested from the ultra-condense fallback
    pub ultra_condense_words: usize,
    /// Number of reference examples retrieved
    pub example_count: usize,
    /// Length of each reference excerpt placed in the prompt
    pub example_excerpt_chars: usize,
    /// Longest reference text sent to the embedder
    pub embed_max_chars: usize,
    /// Most inputs sent in one embedding request
    pub embed_batch_size: usize,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Socket address to bind
    pub bind: String,
    /// Origins allowed by CORS
    pub cors_origins: Vec<String>,
}

/// Filesystem locations used by the generator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Parent directory of per-request repository checkouts
    pub workspace: PathBuf,
    /// Directory holding reference README files
    pub examples_dir: PathBuf,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            api_key: None,
            api_base: None,
            model: None,
            embedding_model: None,
            max_tokens: 2000,
            temperature: 0.4,
        }
    }
}

impl LlmSettings {
    /// Resolved API base URL
    pub fn api_base(&self) -> &str {
        self.api_base.as_deref().unwrap_or(self.provider.default_api_base())
    }

    /// Resolved chat model identifier
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(self.provider.default_model())
    }

    /// Resolved embedding model identifier
    pub fn embedding_model(&self) -> &str {
        self.embedding_model
            .as_deref()
            .unwrap_or(self.provider.default_embedding_model())
    }

    /// The API key, or a configuration error naming the missing variables
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ReadmeError::Config("GEMINI_API_KEY or OPENAI_API_KEY must be set".into()))
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_size: 3000,
            chunk_overlap: 200,
            reduce_budget: 12_000,
            max_reduce_depth: 4,
            map_concurrency: 4,
            condense_threshold: 2000,
            condense_chunk_size: 600,
            condense_chunk_overlap: 100,
            search_condense_threshold: 800,
            ultra_condense_budget: 3000,
            ultra_condense_words: 400,
            example_count: 2,
            example_excerpt_chars: 1000,
            embed_max_chars: 8000,
            embed_batch_size: 100,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
                "https://gitreadme.vercel.app".to_string(),
            ],
        }
    }
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from("projects"),
            examples_dir: PathBuf::from("examples"),
        }
    }
}

impl Config {
    /// Builds the configuration from defaults and environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file, then applies environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ReadmeError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let mut config: Self = toml::from_str(&content)
            .map_err(|e| ReadmeError::Config(format!("Failed to parse config file: {}", e)))?;
        config.apply_env()?;
        Ok(config)
    }

    /// Loads `<config dir>/gitreadme/config.toml` when present, the environment otherwise
    pub fn load_default() -> Result<Self> {
        match dirs::config_dir().map(|dir| dir.join("gitreadme").join("config.toml")) {
            Some(path) if path.exists() => Self::load(&path),
            _ => Self::from_env(),
        }
    }

    /// Overlays environment variables on top of the current values
    pub fn apply_env(&mut self) -> Result<()> {
        let keys = ApiKeys::from_env();
        if let Some((provider, key)) = keys.llm_credential() {
            self.llm.provider = provider;
            self.llm.api_key = Some(key);
        }
        if keys.github_token.is_some() {
            self.github_token = keys.github_token;
        }

        if let Some(model) = get_env_value("GITREADME_MODEL") {
            self.llm.model = Some(model);
        }
        if let Some(model) = get_env_value("GITREADME_EMBED_MODEL") {
            self.llm.embedding_model = Some(model);
        }
        if let Some(base) = get_env_value("GITREADME_API_BASE") {
            self.llm.api_base = Some(base);
        }
        if let Some(dir) = get_env_value("GITREADME_WORKSPACE") {
            self.paths.workspace = PathBuf::from(dir);
        }
        if let Some(dir) = get_env_value("GITREADME_EXAMPLES_DIR") {
            self.paths.examples_dir = PathBuf::from(dir);
        }
        if let Some(bind) = get_env_value("GITREADME_BIND") {
            self.server.bind = bind;
        }
        if let Some(retries) = get_env_value("GITREADME_MAX_RETRIES") {
            self.retry.max_retries = retries.parse().map_err(|_| {
                ReadmeError::Config(format!("GITREADME_MAX_RETRIES is not a number: {}", retries))
            })?;
        }
        Ok(())
    }

    /// Rejects pipeline settings that would make chunking or reduction meaningless
    pub fn validate(&self) -> Result<()> {
        let p = &self.pipeline;
        let pairs = [
            ("chunk", p.chunk_size, p.chunk_overlap),
            ("condense chunk", p.condense_chunk_size, p.condense_chunk_overlap),
        ];
        for (name, size, overlap) in pairs {
            if size == 0 {
                return Err(ReadmeError::Config(format!("{} size must be positive", name)));
            }
            if overlap >= size {
                return Err(ReadmeError::Config(format!(
                    "{} overlap ({}) must be smaller than the {} size ({})",
                    name, overlap, name, size
                )));
            }
        }
        if p.max_reduce_depth == 0 {
            return Err(ReadmeError::Config("max_reduce_depth must be at least 1".into()));
        }
        if p.reduce_budget < p.chunk_size.min(p.condense_chunk_size) {
            return Err(ReadmeError::Config("reduce_budget is smaller than a single chunk".into()));
        }
        if p.map_concurrency == 0 {
            return Err(ReadmeError::Config("map_concurrency must be at least 1".into()));
        }
        if p.embed_batch_size == 0 {
            return Err(ReadmeError::Config("embed_batch_size must be at least 1".into()));
        }
        Ok(())
    }

    /// Validates the settings and requires an API credential
    pub fn validate_for_backend(&self) -> Result<()> {
        self.validate()?;
        self.llm.require_api_key()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pipeline.chunk_size, 3000);
        assert_eq!(config.pipeline.condense_threshold, 2000);
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.llm.model(), "gemini-2.0-flash");
    }

    #[test]
    fn test_missing_key_is_fatal() {
        let config = Config::default();
        let err = config.validate_for_backend().unwrap_err();
        assert!(matches!(err, ReadmeError::Config(_)));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut config = Config::default();
        config.pipeline.chunk_overlap = config.pipeline.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_embed_batch_size_must_be_positive() {
        let mut config = Config::default();
        assert_eq!(config.pipeline.embed_batch_size, 100);
        config.pipeline.embed_batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(
            file,
            "[pipeline]\nchunk_size = 4000\n\n[llm]\nprovider = \"openai\"\nmodel = \"gpt-4o\"\n"
        )?;

        let content = fs::read_to_string(file.path())?;
        let config: Config = toml::from_str(&content).unwrap();
        assert_eq!(config.pipeline.chunk_size, 4000);
        assert_eq!(config.pipeline.chunk_overlap, 200);
        assert_eq!(config.llm.provider, Provider::OpenAi);
        assert_eq!(config.llm.model(), "gpt-4o");
        assert_eq!(config.llm.embedding_model(), "text-embedding-3-small");
        assert_eq!(config.llm.api_base(), "https://api.openai.com/v1");
        Ok(())
    }
}
