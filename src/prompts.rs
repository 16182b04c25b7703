//! Prompt templates. `{text}` is replaced by [`render`].

/// Map prompt for corpus chunks
pub const CORPUS_MAP: &str = r#"Write a concise summary of the following:


"{text}"


CONCISE SUMMARY:"#;

/// Combine prompt for partial corpus summaries
pub const CORPUS_COMBINE: &str = r#"Write a concise summary of the following:


"{text}"


CONCISE SUMMARY:"#;

/// Map prompt of the condensation pass
pub const CONDENSE_MAP: &str = "Extract key points:\n\n{text}\n\nPOINTS:";

/// Combine prompt of the condensation pass
pub const CONDENSE_COMBINE: &str = "Combine points into a short technical summary:\n\n{text}\n\nSUMMARY:";

/// Single-shot last-resort summary; `{words}` is the word limit
pub const ULTRA_CONDENSE: &str = "Summarize under {words} words:\n\n{text}";

/// Full README request
pub const STANDARD_README: &str = r#"
You are a professional documentation writer.

SUMMARY:
{text}

Produce a complete README.md including:
- Title
- Description
- Features
- Setup/installation
- Usage
- API details (if any)
- Configuration
- Examples
- Development & Contribution
- License
"#;

/// Retry prompt after a context-length failure
pub const MINIMAL_README: &str = "Generate minimal README.md using:\n\n{text}";

/// README request with retrieved examples; `{examples}` holds the excerpts
pub const EXAMPLES_README: &str = r#"
You are a highly-skilled technical writer.
Generate a clean README.md inspired by these examples:

{examples}

Using summary:
{text}

Write full markdown output now.
"#;

/// Substitutes `{text}` in a template
pub fn render(template: &str, text: &str) -> String {
    template.replace("{text}", text)
}

/// The ultra-condense prompt for `text` with a word limit
pub fn ultra_condense(text: &str, words: usize) -> String {
    render(&ULTRA_CONDENSE.replace("{words}", &words.to_string()), text)
}

/// One example section: heading with the source path, then the excerpt
pub fn example_section(source: &str, excerpt: &str) -> String {
    format!("### Example Source → {}\n\n{}", source, excerpt)
}

/// The examples prompt for already-formatted example sections
pub fn examples_readme(sections: &[String], summary: &str) -> String {
    // Substitute examples last so a summary containing "{examples}" stays literal
    render(EXAMPLES_README, summary).replacen("{examples}", &sections.join("\n\n"), 1)
}
