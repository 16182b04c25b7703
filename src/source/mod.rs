//! Repository sources: where a corpus comes from and how its checkout is removed.
//!
//! The orchestrator only sees [`RepoSource`]. [`GitHubSource`] downloads a
//! repository archive, [`LocalSource`] copies a directory on disk; both share
//! the text extraction in [`extract`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::Result;

/// Corpus extraction from a checked-out tree
pub mod extract;
/// GitHub archive downloads
pub mod github;
/// Local directory copies
pub mod local;

pub use extract::extract_corpus;
pub use github::{GitHubSource, RepoUrl};
pub use local::LocalSource;

/// Supplies a repository checkout and its concatenated text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RepoSource: Send + Sync {
    /// Checks a location without touching the network or disk and returns the repository name
    fn validate(&self, location: &str) -> Result<String>;

    /// Materializes the repository under `dest` and returns the repository root
    async fn fetch(&self, location: &str, dest: &Path) -> Result<PathBuf>;

    /// Concatenates the readable files under `root`
    async fn extract_text(&self, root: &Path) -> Result<String>;

    /// Deletes `dir`; returns whether it is gone afterwards
    async fn remove(&self, dir: &Path) -> bool;
}

/// Extracts a corpus on the blocking pool
pub async fn extract_corpus_blocking(root: &Path) -> Result<String> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || extract_corpus(&root))
        .await
        .map_err(|e| crate::error::ReadmeError::Message(format!("Join error: {}", e)))?
}

/// Removes a directory tree; an already missing directory counts as removed
pub async fn remove_dir(dir: &Path) -> bool {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {
            debug!(dir = %dir.display(), "removed working directory");
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            warn!(dir = %dir.display(), "failed to remove working directory: {}", e);
            false
        }
    }
}
