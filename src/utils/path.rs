use std::path::PathBuf;
use uuid::Uuid;

/// Normalize a user-provided local path string into a PathBuf suitable for processing.
///
/// - Trims leading/trailing whitespace
/// - Strips surrounding single or double quotes if present
/// - Expands a leading '~' to the HOME directory when possible
pub fn normalize_user_input_path(input: &str) -> PathBuf {
    let trimmed = input.trim();

    // Remove surrounding quotes if both ends match
    let unquoted = if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
    {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };

    if let Some(rest) = unquoted.strip_prefix('~') {
        let without_tilde = rest.strip_prefix('/').unwrap_or(rest);
        if let Some(home) = std::env::var_os("HOME") {
            let mut buf = PathBuf::from(home);
            if !without_tilde.is_empty() {
                buf.push(without_tilde);
            }
            return buf;
        }
    }

    PathBuf::from(unquoted)
}

/// Replaces every character outside `[A-Za-z0-9_.-]` so the name is safe as one path component.
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        "repo".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Directory name for one generation run: `<repo>-<uuid>`.
///
/// Two concurrent requests for the same repository never share a directory.
pub fn unique_workdir_name(repo_name: &str) -> String {
    format!("{}-{}", sanitize_component(repo_name), Uuid::new_v4().simple())
}
