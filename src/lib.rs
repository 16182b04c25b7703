#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]

//! gitreadme - README generation for source repositories
//!
//! A repository is fetched, its readable files are concatenated into one
//! corpus, the corpus is summarized with a map-reduce LLM pipeline, and the
//! summary is turned into a README, optionally guided by similar reference
//! READMEs found through embedding search.
//!
//! ## Usage
//! ```rust,ignore
//! use gitreadme::{Config, GenerationMethod, GenerationRequest, GitHubSource, ReadmeGenerator};
//! use std::sync::Arc;
//!
//! async fn example() -> gitreadme::Result<()> {
//!     let config = Arc::new(Config::from_env()?);
//!     let source = Arc::new(GitHubSource::new(config.github_token.as_deref())?);
//!     let generator = ReadmeGenerator::from_config(config, source)?;
//!
//!     let request = GenerationRequest::new("https://github.com/rust-lang/log", GenerationMethod::Standard);
//!     let result = generator.generate(&request).await;
//!     println!("{}", result.readme_content);
//!     Ok(())
//! }
//! ```

/// Configuration module for the application
pub mod config;
/// Error handling types and utilities
pub mod error;
/// Logging configuration and utilities
pub mod logging;
/// Language-model and embedding backends
pub mod llm;
/// Prompt templates
pub mod prompts;
/// Chunking, summarization, condensation, retrieval and composition
pub mod pipeline;
/// Repository fetching, text extraction and cleanup
pub mod source;
/// The generation state machine
pub mod orchestrator;
/// REST API functionality for web service
pub mod api;
/// Deterministic fakes for tests
pub mod testing;
/// Utilities (path normalization, retry helpers)
pub mod utils;

// Re-export common types
pub use config::Config;
pub use error::{ErrorKind, ReadmeError, Result};
pub use llm::{Embedder, LanguageModel, LlmResponse, OpenAiBackend};
pub use orchestrator::{
    GenerationMethod, GenerationReport, GenerationRequest, GenerationResult, ReadmeGenerator, Stage,
};
pub use pipeline::{ReferenceCorpus, TextSplitter};
pub use source::{GitHubSource, LocalSource, RepoSource, RepoUrl};
