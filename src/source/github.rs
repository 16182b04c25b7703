use std::fmt;
use std::fs as std_fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use tokio::fs as tokio_fs;
use tracing::{debug, info};
use url::Url;

use crate::error::{ReadmeError, Result};
use super::{extract_corpus_blocking, remove_dir, RepoSource};

const GITHUB_API_BASE: &str = "https://api.github.com";
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// A validated `https://github.com/<owner>/<repo>` location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoUrl {
    /// Account or organization
    pub owner: String,
    /// Repository name without `.git`
    pub name: String,
}

impl RepoUrl {
    /// Parses a GitHub repository URL.
    ///
    /// Accepts `http`/`https`, host `github.com` or `www.github.com`, exactly
    /// two path segments, an optional trailing `/` or `.git`.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let invalid = || ReadmeError::InvalidInput(format!("not a GitHub repository URL: {}", trimmed));

        let url = Url::parse(trimmed).map_err(|_| invalid())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid());
        }
        if !matches!(url.host_str(), Some("github.com") | Some("www.github.com")) {
            return Err(invalid());
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid());
        }

        let mut segments: Vec<&str> = url.path_segments().ok_or_else(invalid)?.collect();
        if segments.last() == Some(&"") {
            segments.pop();
        }
        let &[owner, repo] = segments.as_slice() else {
            return Err(invalid());
        };

        let name = repo.strip_suffix(".git").unwrap_or(repo);
        if !is_valid_segment(owner) || !is_valid_segment(name) {
            return Err(invalid());
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// API path of the default-branch zip archive
    pub fn zipball_path(&self) -> String {
        format!("/repos/{}/{}/zipball", self.owner, self.name)
    }
}

impl fmt::Display for RepoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "https://github.com/{}/{}", self.owner, self.name)
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Fetches GitHub repositories as zip archives of the default branch
#[derive(Debug, Clone)]
pub struct GitHubSource {
    client: Client,
    api_base: String,
}

impl GitHubSource {
    /// Creates a source, authenticating with `token` when given
    pub fn new(token: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("gitreadme"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|e| ReadmeError::Config(format!("invalid GitHub token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .default_headers(headers)
            .build()
            .map_err(|e| ReadmeError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_base: GITHUB_API_BASE.to_string(),
        })
    }

    /// Points the source at another API host
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    async fn download_archive(&self, repo: &RepoUrl) -> Result<Vec<u8>> {
        let url = format!("{}{}", self.api_base, repo.zipball_path());
        debug!(url = %url, "downloading repository archive");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ReadmeError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ReadmeError::Filesystem(format!(
                "Failed to download {}: HTTP {}",
                repo,
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ReadmeError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl RepoSource for GitHubSource {
    fn validate(&self, location: &str) -> Result<String> {
        RepoUrl::parse(location).map(|repo| repo.name)
    }

    async fn fetch(&self, location: &str, dest: &Path) -> Result<PathBuf> {
        let repo = RepoUrl::parse(location)?;
        let archive = self.download_archive(&repo).await?;
        info!(repo = %repo, bytes = archive.len(), "archive downloaded");

        extract_archive(archive, dest).await?;
        find_repository_root(dest).await
    }

    async fn extract_text(&self, root: &Path) -> Result<String> {
        extract_corpus_blocking(root).await
    }

    async fn remove(&self, dir: &Path) -> bool {
        remove_dir(dir).await
    }
}

/// Unpacks a zip archive into `extract_path`, skipping entries that escape it
pub async fn extract_archive(archive: Vec<u8>, extract_path: &Path) -> Result<()> {
    tokio_fs::create_dir_all(extract_path).await?;
    let path = extract_path.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut archive = zip::ZipArchive::new(Cursor::new(archive))?;

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let outpath = match file.enclosed_name() {
                Some(relative) => path.join(relative),
                None => continue,
            };

            if file.is_dir() {
                std_fs::create_dir_all(&outpath)?;
            } else {
                if let Some(parent) = outpath.parent() {
                    std_fs::create_dir_all(parent)?;
                }
                let mut outfile = std_fs::File::create(&outpath)?;
                std::io::copy(&mut file, &mut outfile)?;
            }
        }

        Ok(())
    })
    .await
    .map_err(|e| ReadmeError::Message(format!("Join error: {}", e)))?
}

/// GitHub archives wrap everything in one `<owner>-<repo>-<sha>/` folder; that folder is the root
async fn find_repository_root(extract_path: &Path) -> Result<PathBuf> {
    let mut entries = tokio_fs::read_dir(extract_path).await?;
    let mut dirs = Vec::new();
    let mut has_files = false;

    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            dirs.push(entry.path());
        } else {
            has_files = true;
        }
    }

    match (dirs.len(), has_files) {
        (1, false) => Ok(dirs.remove(0)),
        _ => Ok(extract_path.to_path_buf()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_valid_urls() {
        let expected = RepoUrl {
            owner: "rust-lang".into(),
            name: "rustlings".into(),
        };
        for url in [
            "https://github.com/rust-lang/rustlings",
            "https://github.com/rust-lang/rustlings/",
            "https://github.com/rust-lang/rustlings.git",
            "http://www.github.com/rust-lang/rustlings",
            "  https://github.com/rust-lang/rustlings  ",
        ] {
            assert_eq!(RepoUrl::parse(url).unwrap(), expected, "{}", url);
        }
    }

    #[test]
    fn test_parse_rejects_malformed_urls() {
        for url in [
            "not-a-url",
            "",
            "ftp://github.com/a/b",
            "https://gitlab.com/a/b",
            "https://github.com/only-owner",
            "https://github.com/a/b/tree/main",
            "https://github.com/a/b?tab=readme",
            "https://github.com/a/b%20c",
            "https://github.com/../b",
            "https://github.com/a/.git",
        ] {
            let err = RepoUrl::parse(url).unwrap_err();
            assert!(matches!(err, ReadmeError::InvalidInput(_)), "{}", url);
        }
    }

    #[test]
    fn test_display_and_zipball_path() {
        let repo = RepoUrl::parse("https://github.com/octo/demo.git").unwrap();
        assert_eq!(repo.to_string(), "https://github.com/octo/demo");
        assert_eq!(repo.zipball_path(), "/repos/octo/demo/zipball");
    }

    #[test]
    fn test_validate_returns_name() {
        let source = GitHubSource::new(None).unwrap();
        assert_eq!(source.validate("https://github.com/octo/demo").unwrap(), "demo");
        assert!(source.validate("not-a-url").is_err());
    }

    #[tokio::test]
    async fn test_extract_archive_and_find_root() {
        use std::io::Write;
        use zip::write::FileOptions;

        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            let options = FileOptions::default();
            writer.add_directory("octo-demo-abc123/", options).unwrap();
            writer.start_file("octo-demo-abc123/README.md", options).unwrap();
            writer.write_all(b"# Demo").unwrap();
            writer.start_file("octo-demo-abc123/src/main.rs", options).unwrap();
            writer.write_all(b"fn main() {}").unwrap();
            writer.finish().unwrap();
        }

        let dir = tempfile::TempDir::new().unwrap();
        extract_archive(buffer.into_inner(), dir.path()).await.unwrap();
        let root = find_repository_root(dir.path()).await.unwrap();

        assert_eq!(root, dir.path().join("octo-demo-abc123"));
        assert_eq!(std_fs::read_to_string(root.join("src/main.rs")).unwrap(), "fn main() {}");
    }
}
