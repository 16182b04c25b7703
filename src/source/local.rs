use std::fs as std_fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::error::{ReadmeError, Result};
use crate::utils::normalize_user_input_path;
use super::extract::collect_files;
use super::{extract_corpus_blocking, remove_dir, RepoSource};

/// A repository that already exists on disk.
///
/// `fetch` copies the allow-listed files into the working directory so that
/// cleanup never touches the user's tree.
#[derive(Debug, Clone, Default)]
pub struct LocalSource;

impl LocalSource {
    /// Creates a local source
    pub fn new() -> Self {
        Self
    }
}

fn resolve(location: &str) -> Result<(PathBuf, String)> {
    if location.trim().is_empty() {
        return Err(ReadmeError::InvalidInput("empty path".into()));
    }
    let path = normalize_user_input_path(location);
    let name = path
        .canonicalize()
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .or_else(|| path.file_name())
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| "repo".to_string());
    Ok((path, name))
}

/// Copies the allow-listed files of `src` into `dest`, preserving relative paths
fn copy_text_tree(src: &Path, dest: &Path) -> Result<usize> {
    std_fs::create_dir_all(dest)?;
    let mut copied = 0;
    for file in collect_files(src) {
        let relative = file
            .strip_prefix(src)
            .map_err(|e| ReadmeError::Filesystem(e.to_string()))?;
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            std_fs::create_dir_all(parent)?;
        }
        std_fs::copy(&file, &target)?;
        copied += 1;
    }
    Ok(copied)
}

#[async_trait]
impl RepoSource for LocalSource {
    fn validate(&self, location: &str) -> Result<String> {
        resolve(location).map(|(_, name)| name)
    }

    async fn fetch(&self, location: &str, dest: &Path) -> Result<PathBuf> {
        let (path, name) = resolve(location)?;
        if !path.is_dir() {
            return Err(ReadmeError::Filesystem(format!(
                "{} is not a directory",
                path.display()
            )));
        }

        let root = dest.join(crate::utils::sanitize_component(&name));
        let target = root.clone();
        let copied = tokio::task::spawn_blocking(move || copy_text_tree(&path, &target))
            .await
            .map_err(|e| ReadmeError::Message(format!("Join error: {}", e)))??;

        info!(repo = %name, files = copied, "local repository copied");
        Ok(root)
    }

    async fn extract_text(&self, root: &Path) -> Result<String> {
        extract_corpus_blocking(root).await
    }

    async fn remove(&self, dir: &Path) -> bool {
        remove_dir(dir).await
    }
}
