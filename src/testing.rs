//! Deterministic stand-ins for the model, the embedder and the repository source.
//!
//! Used by unit tests and by the integration tests under `tests/`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ReadmeError, Result};
use crate::llm::{Embedder, LanguageModel, LlmResponse};
use crate::source::{extract_corpus_blocking, remove_dir, RepoSource, RepoUrl};

type Responder = Box<dyn Fn(&str) -> Result<LlmResponse> + Send + Sync>;

/// Canned README returned by [`ScriptedModel::readme_writer`]
pub const CANNED_README: &str = "# Demo Project\n\nA small demo project.\n\n## Usage\n\nRun it.";

/// Canned summary returned by [`ScriptedModel::readme_writer`]
pub const CANNED_SUMMARY: &str = "A small demo project written in Rust.";

/// True for prompts that ask for the final README
pub fn is_readme_prompt(prompt: &str) -> bool {
    prompt.contains("Produce a complete README.md including:")
        || prompt.starts_with("Generate minimal README.md")
        || prompt.contains("Generate a clean README.md inspired by these examples")
}

/// A language model answering from a closure and recording every prompt
pub struct ScriptedModel {
    responder: Responder,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    /// Answers every prompt with a message built by `reply`
    pub fn new<F>(reply: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self::from_fn(move |prompt| Ok(LlmResponse::message(reply(prompt))))
    }

    /// Full control over the response shape and failures
    pub fn from_fn<F>(respond: F) -> Self
    where
        F: Fn(&str) -> Result<LlmResponse> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(respond),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Answers with the prompt itself
    pub fn echo() -> Self {
        Self::new(|prompt| prompt.to_string())
    }

    /// Fails every call with the error built by `error`
    pub fn failing<F>(error: F) -> Self
    where
        F: Fn() -> ReadmeError + Send + Sync + 'static,
    {
        Self::from_fn(move |_| Err(error()))
    }

    /// Returns [`CANNED_README`] for README prompts and [`CANNED_SUMMARY`] otherwise
    pub fn readme_writer() -> Self {
        Self::new(|prompt| {
            if is_readme_prompt(prompt) {
                CANNED_README.to_string()
            } else {
                CANNED_SUMMARY.to_string()
            }
        })
    }

    /// Every prompt received, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of calls received
    pub fn calls(&self) -> usize {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Number of calls whose prompt starts with `prefix`
    pub fn calls_starting_with(&self, prefix: &str) -> usize {
        self.prompts().iter().filter(|p| p.starts_with(prefix)).count()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn invoke(&self, prompt: &str) -> Result<LlmResponse> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(prompt.to_string());
        (self.responder)(prompt)
    }
}

/// Embeds text as keyword occurrence counts, one dimension per keyword
pub struct StaticEmbedder {
    keywords: Vec<String>,
    calls: AtomicUsize,
}

impl StaticEmbedder {
    /// Creates an embedder over case-insensitive keywords
    pub fn new(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `embed` calls received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for StaticEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(inputs
            .iter()
            .map(|input| {
                let lower = input.to_lowercase();
                self.keywords
                    .iter()
                    .map(|k| lower.matches(k.as_str()).count() as f32)
                    .collect()
            })
            .collect())
    }
}

/// Stage at which a [`FixtureSource`] fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    /// `fetch` fails after creating the working directory
    Fetch,
    /// `extract_text` fails
    Extract,
}

/// An in-memory repository written to the working directory on fetch.
///
/// Validates locations as GitHub URLs.
pub struct FixtureSource {
    files: Vec<(String, String)>,
    fail_at: Option<FailPoint>,
    fetches: AtomicUsize,
    removals: AtomicUsize,
}

impl FixtureSource {
    /// An empty repository
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            fail_at: None,
            fetches: AtomicUsize::new(0),
            removals: AtomicUsize::new(0),
        }
    }

    /// A small Rust project
    pub fn sample() -> Self {
        Self::new()
            .with_file("Cargo.toml", "[package]\nname = \"demo\"\nversion = \"0.1.0\"\n")
            .with_file("src/main.rs", "fn main() {\n    println!(\"hello\");\n}\n")
    }

    /// Adds a file at a relative path
    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.push((path.to_string(), content.to_string()));
        self
    }

    /// Injects a failure
    pub fn failing_at(mut self, point: FailPoint) -> Self {
        self.fail_at = Some(point);
        self
    }

    /// Number of `fetch` calls
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of `remove` calls
    pub fn removals(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }
}

impl Default for FixtureSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RepoSource for FixtureSource {
    fn validate(&self, location: &str) -> Result<String> {
        RepoUrl::parse(location).map(|repo| repo.name)
    }

    async fn fetch(&self, location: &str, dest: &Path) -> Result<PathBuf> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let name = self.validate(location)?;
        let root = dest.join(name);
        tokio::fs::create_dir_all(&root).await?;

        if self.fail_at == Some(FailPoint::Fetch) {
            return Err(ReadmeError::Filesystem("injected fetch failure".into()));
        }

        for (path, content) in &self.files {
            let target = root.join(path);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, content).await?;
        }
        Ok(root)
    }

    async fn extract_text(&self, root: &Path) -> Result<String> {
        if self.fail_at == Some(FailPoint::Extract) {
            return Err(ReadmeError::Filesystem("injected extraction failure".into()));
        }
        extract_corpus_blocking(root).await
    }

    async fn remove(&self, dir: &Path) -> bool {
        self.removals.fetch_add(1, Ordering::SeqCst);
        remove_dir(dir).await
    }
}
