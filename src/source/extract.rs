//! Concatenates a repository's readable files into one text corpus.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::Result;

/// File extensions whose contents are included in the corpus
pub const TEXT_EXTENSIONS: &[&str] = &[
    "py", "md", "txt", "json", "yaml", "yml", "csv", "ini", "cfg", "xml", "html", "js", "css",
    "java", "c", "cpp", "ts", "go", "rs", "rb", "php", "sh", "bat", "toml",
];

/// Directories never descended into
pub const IGNORED_DIRS: &[&str] = &[
    ".git", "node_modules", "target", "dist", "build", "__pycache__", ".venv", "venv",
];

/// Checks whether a file name carries an allow-listed extension
pub fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| TEXT_EXTENSIONS.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

fn is_ignored_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| IGNORED_DIRS.contains(&name))
            .unwrap_or(false)
}

/// Lists allow-listed files under `root`, sorted by path.
///
/// Unreadable entries are logged and skipped.
pub fn collect_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_ignored_dir(e))
    {
        match entry {
            Ok(entry) if entry.file_type().is_file() && is_text_file(entry.path()) => {
                files.push(entry.into_path());
            }
            Ok(_) => {}
            Err(e) => {
                let path = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "unknown path".to_string());
                warn!("Skipping {}: {}", path, e);
            }
        }
    }

    files
}

/// Reads one file as text, or `None` when it is binary or not UTF-8
fn read_text(path: &Path) -> Result<Option<String>> {
    let bytes = fs::read(path)?;
    if content_inspector::inspect(&bytes).is_binary() {
        debug!(path = %path.display(), "skipping binary file");
        return Ok(None);
    }
    match String::from_utf8(bytes) {
        Ok(text) => Ok(Some(text)),
        Err(_) => {
            warn!(path = %path.display(), "skipping file that is not valid UTF-8");
            Ok(None)
        }
    }
}

/// Builds the corpus: `File: <relative path>\n<content>\n\n` per readable file
pub fn extract_corpus(root: &Path) -> Result<String> {
    let mut corpus = String::new();
    let mut included = 0usize;

    for path in collect_files(root) {
        let text = match read_text(&path) {
            Ok(Some(text)) => text,
            Ok(None) => continue,
            Err(e) => {
                warn!(path = %path.display(), "skipping unreadable file: {}", e);
                continue;
            }
        };
        let relative = path.strip_prefix(root).unwrap_or(&path);
        corpus.push_str(&format!(
            "File: {}\n{}\n\n",
            relative.to_string_lossy().replace('\\', "/"),
            text
        ));
        included += 1;
    }

    debug!(files = included, chars = corpus.chars().count(), "corpus extracted");
    Ok(corpus)
}
