//! End-to-end generation: fetch, extract, summarize, optionally retrieve, compose, write, clean up.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::fs as tokio_fs;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{ReadmeError, Result};
use crate::llm::{Embedder, LanguageModel, OpenAiBackend};
use crate::pipeline::chunker::{char_len, truncate_chars};
use crate::pipeline::{summarize_corpus, Composer, ReferenceCorpus};
use crate::source::RepoSource;
use crate::utils::unique_workdir_name;

/// File the generated README is written to inside the repository root
pub const GENERATED_README: &str = "GENERATED_README.md";

const PREVIEW_CHARS: usize = 1000;

/// How the README is composed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GenerationMethod {
    /// Summary plus a fixed section template
    #[default]
    #[serde(rename = "Standard README")]
    Standard,
    /// Summary plus retrieved reference READMEs
    #[serde(rename = "README with Examples")]
    WithExamples,
}

impl GenerationMethod {
    /// The label used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "Standard README",
            Self::WithExamples => "README with Examples",
        }
    }
}

impl fmt::Display for GenerationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationMethod {
    type Err = ReadmeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "standard readme" | "standard" => Ok(Self::Standard),
            "readme with examples" | "examples" | "with-examples" => Ok(Self::WithExamples),
            _ => Err(ReadmeError::InvalidInput(format!("unknown generation method: {}", s))),
        }
    }
}

/// Input of one generation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Repository URL or path, interpreted by the configured source
    pub location: String,
    /// Composition mode
    pub method: GenerationMethod,
}

impl GenerationRequest {
    /// Creates a request
    pub fn new(location: impl Into<String>, method: GenerationMethod) -> Self {
        Self {
            location: location.into(),
            method,
        }
    }
}

/// Caller-facing outcome of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Whether a README was produced
    pub success: bool,
    /// The README, empty on failure
    pub readme_content: String,
    /// Human-readable error, empty on success
    pub error_message: String,
    /// RFC 3339 completion time
    pub generation_timestamp: String,
    /// Echo of the requested location
    pub repo_url: String,
    /// Echo of the requested method label
    pub generation_method: String,
}

/// States of a run; transitions only move forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Not started
    Idle,
    /// Fetching the repository
    Cloning,
    /// Building the corpus
    Extracting,
    /// Map-reduce over the corpus
    Summarizing,
    /// Searching reference examples
    Retrieving,
    /// Generating the README
    Composing,
    /// Writing the artifact
    Writing,
    /// Removing the working directory
    CleaningUp,
    /// Finished with a README
    Done,
    /// Finished with an error
    Failed,
}

/// Stages visited by a run and its terminal outcome
#[derive(Debug)]
pub struct GenerationReport {
    /// Every stage entered, in order, starting at [`Stage::Idle`]
    pub stages: Vec<Stage>,
    /// The README, or the error that ended the run
    pub outcome: Result<String>,
}

impl GenerationReport {
    /// The terminal stage
    pub fn terminal(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Idle)
    }

    /// The stage that was active when cleanup began
    pub fn stage_before_cleanup(&self) -> Option<Stage> {
        let at = self.stages.iter().position(|s| *s == Stage::CleaningUp)?;
        at.checked_sub(1).map(|i| self.stages[i])
    }
}

/// Forward-only stage log
struct Progress {
    stages: Vec<Stage>,
}

impl Progress {
    fn new() -> Self {
        Self {
            stages: vec![Stage::Idle],
        }
    }

    fn current(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Idle)
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(next > self.current(), "{:?} -> {:?}", self.current(), next);
        debug!(from = ?self.current(), to = ?next, "stage transition");
        self.stages.push(next);
    }

    fn finish(mut self, outcome: Result<String>) -> GenerationReport {
        self.advance(if outcome.is_ok() { Stage::Done } else { Stage::Failed });
        GenerationReport {
            stages: self.stages,
            outcome,
        }
    }
}

/// Runs generation requests against shared, immutable collaborators
pub struct ReadmeGenerator {
    config: Arc<Config>,
    model: Arc<dyn LanguageModel>,
    embedder: Arc<dyn Embedder>,
    source: Arc<dyn RepoSource>,
    references: Arc<ReferenceCorpus>,
    composer: Composer,
}

impl ReadmeGenerator {
    /// Assembles a generator from explicit collaborators
    pub fn new(
        config: Arc<Config>,
        model: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
        source: Arc<dyn RepoSource>,
        references: ReferenceCorpus,
    ) -> Self {
        let composer = Composer::new(&config.pipeline);
        Self {
            config,
            model,
            embedder,
            source,
            references: Arc::new(references),
            composer,
        }
    }

    /// Builds the production generator: OpenAI-compatible backend, references from `paths.examples_dir`.
    ///
    /// Fails when settings are inconsistent or no API credential is configured.
    pub fn from_config(config: Arc<Config>, source: Arc<dyn RepoSource>) -> Result<Self> {
        config.validate_for_backend()?;
        let backend = Arc::new(OpenAiBackend::new(&config.llm, config.retry)?);
        let references = ReferenceCorpus::load(&config.paths.examples_dir);
        Ok(Self::new(
            config,
            backend.clone(),
            backend,
            source,
            references,
        ))
    }

    /// The configuration the generator was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of loaded reference examples
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Checks a location without side effects and returns the repository name
    pub fn validate(&self, location: &str) -> Result<String> {
        self.source.validate(location)
    }

    /// Runs one request through every stage.
    ///
    /// A location that fails validation ends the run immediately with no
    /// cleanup. Otherwise cleanup is attempted exactly once, whatever the outcome.
    pub async fn run(&self, request: &GenerationRequest) -> GenerationReport {
        let mut progress = Progress::new();

        let name = match self.source.validate(&request.location) {
            Ok(name) => name,
            Err(e) => {
                warn!(location = %request.location, "rejected: {}", e);
                return progress.finish(Err(e));
            }
        };

        let workdir = self.config.paths.workspace.join(unique_workdir_name(&name));
        info!(repo = %name, method = %request.method, workdir = %workdir.display(), "generation started");

        let outcome = self.execute(request, &workdir, &mut progress).await;
        if let Err(e) = &outcome {
            error!(repo = %name, stage = ?progress.current(), "generation failed: {}", e);
        }

        progress.advance(Stage::CleaningUp);
        if !self.source.remove(&workdir).await {
            warn!(workdir = %workdir.display(), "cleanup failed, leaving working directory behind");
        }

        let report = progress.finish(outcome);
        info!(repo = %name, terminal = ?report.terminal(), "generation finished");
        report
    }

    async fn execute(
        &self,
        request: &GenerationRequest,
        workdir: &Path,
        progress: &mut Progress,
    ) -> Result<String> {
        let model = self.model.as_ref();

        progress.advance(Stage::Cloning);
        let root = self.source.fetch(&request.location, workdir).await?;

        progress.advance(Stage::Extracting);
        let corpus = self.source.extract_text(&root).await?;
        if corpus.trim().is_empty() {
            return Err(ReadmeError::InvalidInput(
                "repository contains no readable files".into(),
            ));
        }
        info!(chars = char_len(&corpus), "corpus extracted");

        progress.advance(Stage::Summarizing);
        let summary = summarize_corpus(model, &self.config.pipeline, &corpus).await?;
        if summary.is_empty() {
            return Err(ReadmeError::Upstream("summarization produced no text".into()));
        }
        info!(chars = char_len(&summary), "corpus summarized");

        let readme = match request.method {
            GenerationMethod::Standard => {
                progress.advance(Stage::Composing);
                self.composer.compose_standard(model, &summary).await?
            }
            GenerationMethod::WithExamples => {
                progress.advance(Stage::Retrieving);
                let retrieval = self
                    .composer
                    .retrieve(model, self.embedder.as_ref(), &self.references, &summary)
                    .await?;

                progress.advance(Stage::Composing);
                self.composer
                    .compose_with_examples(model, &summary, retrieval.as_ref())
                    .await?
            }
        };
        if readme.is_empty() {
            return Err(ReadmeError::Upstream("model returned an empty README".into()));
        }

        progress.advance(Stage::Writing);
        let artifact = write_artifact(&root, &readme).await?;
        info!(
            path = %artifact.display(),
            "README preview:\n{}",
            truncate_chars(&readme, PREVIEW_CHARS)
        );

        Ok(readme)
    }

    /// Runs a request and converts the report into the caller-facing result
    pub async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        let report = self.run(request).await;
        let (success, readme_content, error_message) = match report.outcome {
            Ok(readme) => (true, readme, String::new()),
            Err(e) => (false, String::new(), e.to_string()),
        };

        GenerationResult {
            success,
            readme_content,
            error_message,
            generation_timestamp: Utc::now().to_rfc3339(),
            repo_url: request.location.clone(),
            generation_method: request.method.to_string(),
        }
    }
}

async fn write_artifact(root: &Path, readme: &str) -> Result<PathBuf> {
    let path = root.join(GENERATED_README);
    tokio_fs::write(&path, readme).await.map_err(|e| {
        ReadmeError::Filesystem(format!("failed to write {}: {}", path.display(), e))
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockRepoSource;
    use crate::testing::{ScriptedModel, StaticEmbedder};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn generator(source: MockRepoSource, workspace: &Path) -> ReadmeGenerator {
        let mut config = Config::default();
        config.paths.workspace = workspace.to_path_buf();
        ReadmeGenerator::new(
            Arc::new(config),
            Arc::new(ScriptedModel::readme_writer()),
            Arc::new(StaticEmbedder::new(&[])),
            Arc::new(source),
            ReferenceCorpus::default(),
        )
    }

    #[test]
    fn test_method_labels() {
        assert_eq!("Standard README".parse::<GenerationMethod>().unwrap(), GenerationMethod::Standard);
        assert_eq!(
            "README with Examples".parse::<GenerationMethod>().unwrap(),
            GenerationMethod::WithExamples
        );
        assert_eq!("examples".parse::<GenerationMethod>().unwrap(), GenerationMethod::WithExamples);
        assert!(matches!(
            "Fancy README".parse::<GenerationMethod>(),
            Err(ReadmeError::InvalidInput(_))
        ));
        assert_eq!(GenerationMethod::default().to_string(), "Standard README");
    }

    #[test]
    fn test_method_serde_uses_labels() {
        let json = serde_json::to_string(&GenerationMethod::WithExamples).unwrap();
        assert_eq!(json, "\"README with Examples\"");
    }

    #[test]
    fn test_stages_are_ordered() {
        assert!(Stage::Idle < Stage::Cloning);
        assert!(Stage::Summarizing < Stage::Retrieving);
        assert!(Stage::Writing < Stage::CleaningUp);
        assert!(Stage::CleaningUp < Stage::Done);
    }

    #[tokio::test]
    async fn test_invalid_location_touches_nothing() {
        let mut source = MockRepoSource::new();
        source
            .expect_validate()
            .returning(|_| Err(ReadmeError::InvalidInput("not-a-url".into())));
        source.expect_fetch().never();
        source.expect_remove().never();

        let workspace = TempDir::new().unwrap();
        let report = generator(source, workspace.path())
            .run(&GenerationRequest::new("not-a-url", GenerationMethod::Standard))
            .await;

        assert_eq!(report.stages, vec![Stage::Idle, Stage::Failed]);
        assert!(matches!(report.outcome, Err(ReadmeError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_fetch_failure_still_cleans_up_once() {
        let mut source = MockRepoSource::new();
        source.expect_validate().returning(|_| Ok("demo".into()));
        source
            .expect_fetch()
            .times(1)
            .returning(|_, _| Err(ReadmeError::Filesystem("clone failed".into())));
        source.expect_extract_text().never();
        source.expect_remove().times(1).returning(|_| false);

        let workspace = TempDir::new().unwrap();
        let report = generator(source, workspace.path())
            .run(&GenerationRequest::new("https://github.com/o/demo", GenerationMethod::Standard))
            .await;

        assert_eq!(
            report.stages,
            vec![Stage::Idle, Stage::Cloning, Stage::CleaningUp, Stage::Failed]
        );
        assert_eq!(report.stage_before_cleanup(), Some(Stage::Cloning));
    }

    #[tokio::test]
    async fn test_empty_corpus_is_invalid_input() {
        let workspace = TempDir::new().unwrap();
        let root = workspace.path().join("checkout");
        std::fs::create_dir_all(&root).unwrap();

        let mut source = MockRepoSource::new();
        source.expect_validate().returning(|_| Ok("demo".into()));
        let fetched = root.clone();
        source.expect_fetch().returning(move |_, _| Ok(fetched.clone()));
        source.expect_extract_text().returning(|_| Ok("   ".into()));
        source.expect_remove().times(1).returning(|_| true);

        let report = generator(source, workspace.path())
            .run(&GenerationRequest::new("https://github.com/o/demo", GenerationMethod::Standard))
            .await;

        assert_eq!(report.stage_before_cleanup(), Some(Stage::Extracting));
        assert!(matches!(report.outcome, Err(ReadmeError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_cleanup_failure_keeps_success() {
        let workspace = TempDir::new().unwrap();
        let root = workspace.path().join("checkout");
        std::fs::create_dir_all(&root).unwrap();

        let mut source = MockRepoSource::new();
        source.expect_validate().returning(|_| Ok("demo".into()));
        let fetched = root.clone();
        source.expect_fetch().returning(move |_, _| Ok(fetched.clone()));
        source
            .expect_extract_text()
            .returning(|_| Ok("File: main.rs\nfn main() {}\n\n".into()));
        source.expect_remove().times(1).returning(|_| false);

        let gen = generator(source, workspace.path());
        let result = gen
            .generate(&GenerationRequest::new("https://github.com/o/demo", GenerationMethod::Standard))
            .await;

        assert!(result.success);
        assert!(result.readme_content.starts_with("# "));
        assert_eq!(result.error_message, "");
        assert_eq!(result.generation_method, "Standard README");
        assert!(chrono::DateTime::parse_from_rfc3339(&result.generation_timestamp).is_ok());
        assert_eq!(
            std::fs::read_to_string(root.join(GENERATED_README)).unwrap(),
            result.readme_content
        );
    }
}
