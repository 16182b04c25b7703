use std::sync::Arc;

use async_trait::async_trait;
use gitreadme::error::{ReadmeError, Result};
use gitreadme::pipeline::ReferenceExample;
use gitreadme::testing::{
    is_readme_prompt, FailPoint, FixtureSource, ScriptedModel, CANNED_README,
};
use gitreadme::{Embedder, GenerationMethod, GenerationRequest, ReferenceCorpus, Stage};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

mod common;
use common::test_helpers::*;

fn standard() -> GenerationRequest {
    GenerationRequest::new(REPO_URL, GenerationMethod::Standard)
}

fn with_examples() -> GenerationRequest {
    GenerationRequest::new(REPO_URL, GenerationMethod::WithExamples)
}

struct DownEmbedder;

#[async_trait]
impl Embedder for DownEmbedder {
    async fn embed(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(ReadmeError::Upstream("embedding backend unreachable".into()))
    }
}

#[tokio::test]
async fn test_standard_readme_for_small_repo() {
    setup_test_logger();
    let workspace = TempDir::new().unwrap();
    let h = harness(
        workspace.path(),
        ScriptedModel::readme_writer(),
        FixtureSource::sample(),
        ReferenceCorpus::default(),
    );

    let result = h.generator.generate(&standard()).await;

    assert!(result.success, "{}", result.error_message);
    assert!(!result.readme_content.is_empty());
    assert!(result.readme_content.lines().any(|line| line.starts_with("# ")));
    assert_eq!(result.repo_url, REPO_URL);
    assert_eq!(result.generation_method, "Standard README");
    assert_eq!(h.source.removals(), 1);
    assert_eq!(workspace_entries(workspace.path()), 0);
}

#[tokio::test]
async fn test_stage_sequence_for_both_methods() {
    let workspace = TempDir::new().unwrap();
    let h = harness(
        workspace.path(),
        ScriptedModel::readme_writer(),
        FixtureSource::sample(),
        ReferenceCorpus::default(),
    );

    let report = h.generator.run(&standard()).await;
    assert_eq!(
        report.stages,
        vec![
            Stage::Idle,
            Stage::Cloning,
            Stage::Extracting,
            Stage::Summarizing,
            Stage::Composing,
            Stage::Writing,
            Stage::CleaningUp,
            Stage::Done,
        ]
    );

    let report = h.generator.run(&with_examples()).await;
    assert!(report.stages.contains(&Stage::Retrieving));
    assert_eq!(report.terminal(), Stage::Done);
}

#[tokio::test]
async fn test_malformed_url_is_rejected_before_fetch() {
    let workspace = TempDir::new().unwrap();
    let h = harness(
        workspace.path(),
        ScriptedModel::readme_writer(),
        FixtureSource::sample(),
        ReferenceCorpus::default(),
    );

    let report = h
        .generator
        .run(&GenerationRequest::new("not-a-url", GenerationMethod::Standard))
        .await;

    assert_eq!(report.stages, vec![Stage::Idle, Stage::Failed]);
    assert!(matches!(report.outcome, Err(ReadmeError::InvalidInput(_))));
    assert_eq!(h.source.fetches(), 0);
    assert_eq!(h.source.removals(), 0);
    assert_eq!(h.model.calls(), 0);
}

#[tokio::test]
async fn test_examples_without_references_matches_standard() {
    let standard_dir = TempDir::new().unwrap();
    let standard_run = harness(
        standard_dir.path(),
        ScriptedModel::readme_writer(),
        FixtureSource::sample(),
        ReferenceCorpus::default(),
    );
    let examples_dir = TempDir::new().unwrap();
    let examples_run = harness(
        examples_dir.path(),
        ScriptedModel::readme_writer(),
        FixtureSource::sample(),
        ReferenceCorpus::default(),
    );

    let a = standard_run.generator.generate(&standard()).await;
    let b = examples_run.generator.generate(&with_examples()).await;

    assert!(a.success && b.success);
    assert_eq!(a.readme_content, b.readme_content);
    assert_eq!(standard_run.model.prompts(), examples_run.model.prompts());
}

#[tokio::test]
async fn test_examples_prompt_includes_closest_reference() {
    let workspace = TempDir::new().unwrap();
    let references = ReferenceCorpus::new(vec![
        ReferenceExample::new("examples/http.md", "# HTTP Server\n\nAn http server."),
        ReferenceExample::new("examples/cli.md", "# CLI\n\nA cli tool."),
        ReferenceExample::new("examples/lib.md", "# Library\n\nA library."),
    ]);
    let model = ScriptedModel::new(|prompt| {
        if is_readme_prompt(prompt) {
            CANNED_README.to_string()
        } else {
            "A cli for http testing.".to_string()
        }
    });
    let h = harness(workspace.path(), model, FixtureSource::sample(), references);

    let result = h.generator.generate(&with_examples()).await;
    assert!(result.success, "{}", result.error_message);
    assert_eq!(result.generation_method, "README with Examples");

    let prompts = h.model.prompts();
    let compose = prompts.last().unwrap();
    assert!(compose.contains("### Example Source → examples/"));
    assert!(!compose.contains("examples/lib.md"));
    assert!(compose.contains("Using summary:\nA cli for http testing."));
}

#[tokio::test]
async fn test_long_summary_condensed_once_before_compose() {
    let workspace = TempDir::new().unwrap();
    let model = ScriptedModel::new(|prompt| {
        if is_readme_prompt(prompt) {
            CANNED_README.to_string()
        } else if prompt.starts_with("Extract key points") {
            "- key point".to_string()
        } else if prompt.starts_with("Combine points") {
            "A short technical summary.".to_string()
        } else {
            "The project exposes a small API. ".repeat(152).trim_end().to_string()
        }
    });
    let h = harness(workspace.path(), model, FixtureSource::sample(), ReferenceCorpus::default());

    let result = h.generator.generate(&standard()).await;
    assert!(result.success, "{}", result.error_message);

    let prompts = h.model.prompts();
    assert_eq!(prompts.len() - 1, prompts.iter().position(|p| is_readme_prompt(p)).unwrap());
    assert_eq!(h.model.calls_starting_with("Combine points"), 1);
    assert!(h.model.calls_starting_with("Extract key points") > 0);
    assert!(prompts.last().unwrap().contains("SUMMARY:\nA short technical summary."));
}

async fn assert_cleanup_after_failure(
    model: ScriptedModel,
    source: FixtureSource,
    request: GenerationRequest,
    references: ReferenceCorpus,
    embedder: Option<Arc<dyn Embedder>>,
    failed_in: Stage,
) {
    let workspace = TempDir::new().unwrap();
    let h = match embedder {
        Some(embedder) => {
            harness_with_embedder(workspace.path(), model, source, references, embedder)
        }
        None => harness(workspace.path(), model, source, references),
    };

    let report = h.generator.run(&request).await;

    assert_eq!(report.stage_before_cleanup(), Some(failed_in));
    assert_eq!(report.terminal(), Stage::Failed);
    assert!(report.outcome.is_err());
    assert_eq!(h.source.removals(), 1);
    assert_eq!(workspace_entries(workspace.path()), 0);

    let result = h.generator.generate(&request).await;
    assert!(!result.success);
    assert!(result.readme_content.is_empty());
    assert!(!result.error_message.is_empty());
}

#[tokio::test]
async fn test_cleanup_after_clone_failure() {
    assert_cleanup_after_failure(
        ScriptedModel::readme_writer(),
        FixtureSource::sample().failing_at(FailPoint::Fetch),
        standard(),
        ReferenceCorpus::default(),
        None,
        Stage::Cloning,
    )
    .await;
}

#[tokio::test]
async fn test_cleanup_after_extract_failure() {
    assert_cleanup_after_failure(
        ScriptedModel::readme_writer(),
        FixtureSource::sample().failing_at(FailPoint::Extract),
        standard(),
        ReferenceCorpus::default(),
        None,
        Stage::Extracting,
    )
    .await;
}

#[tokio::test]
async fn test_cleanup_after_summarize_failure() {
    assert_cleanup_after_failure(
        ScriptedModel::failing(|| ReadmeError::Upstream("model offline".into())),
        FixtureSource::sample(),
        standard(),
        ReferenceCorpus::default(),
        None,
        Stage::Summarizing,
    )
    .await;
}

#[tokio::test]
async fn test_cleanup_after_retrieve_failure() {
    assert_cleanup_after_failure(
        ScriptedModel::readme_writer(),
        FixtureSource::sample(),
        with_examples(),
        ReferenceCorpus::new(vec![ReferenceExample::new("a.md", "# A")]),
        Some(Arc::new(DownEmbedder)),
        Stage::Retrieving,
    )
    .await;
}

#[tokio::test]
async fn test_cleanup_after_compose_failure() {
    let model = ScriptedModel::from_fn(|prompt| {
        if is_readme_prompt(prompt) {
            Err(ReadmeError::Upstream("quota exhausted".into()))
        } else {
            Ok("A demo.".into())
        }
    });
    assert_cleanup_after_failure(
        model,
        FixtureSource::sample(),
        standard(),
        ReferenceCorpus::default(),
        None,
        Stage::Composing,
    )
    .await;
}

#[tokio::test]
async fn test_repository_without_readable_files_fails() {
    let workspace = TempDir::new().unwrap();
    let h = harness(
        workspace.path(),
        ScriptedModel::readme_writer(),
        FixtureSource::new().with_file("logo.png", "not really a png"),
        ReferenceCorpus::default(),
    );

    let result = h.generator.generate(&standard()).await;
    assert!(!result.success);
    assert!(result.error_message.contains("no readable files"));
    assert_eq!(h.model.calls(), 0);
}

#[tokio::test]
async fn test_concurrent_requests_for_same_repo_do_not_collide() {
    let workspace = TempDir::new().unwrap();
    let h = harness(
        workspace.path(),
        ScriptedModel::readme_writer(),
        FixtureSource::sample(),
        ReferenceCorpus::default(),
    );

    let request = standard();
    let (a, b) = tokio::join!(h.generator.generate(&request), h.generator.generate(&request));

    assert!(a.success, "{}", a.error_message);
    assert!(b.success, "{}", b.error_message);
    assert_eq!(h.source.removals(), 2);
    assert_eq!(workspace_entries(workspace.path()), 0);
}
