//! Example retrieval: ranks reference READMEs by embedding similarity to a summary.

use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::PipelineSettings;
use crate::error::{ReadmeError, Result};
use crate::llm::Embedder;

use super::chunker::{truncate_chars, TextSplitter};

/// One reference README
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceExample {
    /// Where the document was loaded from
    pub source: String,
    /// Full markdown text
    pub text: String,
}

impl ReferenceExample {
    /// Creates an example
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }
}

/// The fixed set of reference READMEs, loaded once per process
#[derive(Debug, Clone, Default)]
pub struct ReferenceCorpus {
    examples: Vec<ReferenceExample>,
}

impl ReferenceCorpus {
    /// Wraps already-loaded examples
    pub fn new(examples: Vec<ReferenceExample>) -> Self {
        Self { examples }
    }

    /// Loads every `*.md` file under `dir`, recursively and in path order.
    ///
    /// A missing directory yields an empty corpus; unreadable files are skipped.
    pub fn load(dir: &Path) -> Self {
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "examples directory not found, retrieval disabled");
            return Self::default();
        }

        let mut examples = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            let is_markdown = entry.file_type().is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("md"))
                    .unwrap_or(false);
            if !is_markdown {
                continue;
            }
            match fs::read_to_string(path) {
                Ok(text) if !text.trim().is_empty() => {
                    examples.push(ReferenceExample::new(path.display().to_string(), text));
                }
                Ok(_) => debug!(path = %path.display(), "skipping empty example"),
                Err(e) => warn!(path = %path.display(), "skipping unreadable example: {}", e),
            }
        }

        info!(dir = %dir.display(), examples = examples.len(), "reference corpus loaded");
        Self { examples }
    }

    /// All examples in load order
    pub fn examples(&self) -> &[ReferenceExample] {
        &self.examples
    }

    /// Number of examples
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    /// True when there is nothing to retrieve
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}

/// A retrieved example, excerpted for prompting
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedExample {
    /// Where the document was loaded from
    pub source: String,
    /// Bounded leading excerpt of the document
    pub excerpt: String,
    /// Cosine similarity to the query
    pub score: f32,
}

/// Finds the K reference documents closest to a query
#[derive(Debug, Clone)]
pub struct ExampleRetriever {
    k: usize,
    embed_max_chars: usize,
    embed_batch_size: usize,
    excerpts: TextSplitter,
}

impl ExampleRetriever {
    /// Builds a retriever from the pipeline settings
    pub fn new(settings: &PipelineSettings) -> Self {
        Self {
            k: settings.example_count,
            embed_max_chars: settings.embed_max_chars,
            embed_batch_size: settings.embed_batch_size.max(1),
            excerpts: TextSplitter::new(settings.example_excerpt_chars, 0),
        }
    }

    /// Returns up to K examples, most similar first.
    ///
    /// An empty corpus (or K = 0) returns no examples without calling the embedder.
    /// Otherwise every document and then the query are embedded, in requests of
    /// at most `embed_batch_size` inputs.
    pub async fn retrieve(
        &self,
        embedder: &dyn Embedder,
        corpus: &ReferenceCorpus,
        query: &str,
    ) -> Result<Vec<RetrievedExample>> {
        if corpus.is_empty() || self.k == 0 {
            debug!("no reference examples available");
            return Ok(Vec::new());
        }

        let mut inputs: Vec<String> = corpus
            .examples()
            .iter()
            .map(|example| truncate_chars(&example.text, self.embed_max_chars).to_string())
            .collect();
        inputs.push(truncate_chars(query, self.embed_max_chars).to_string());

        let mut vectors = Vec::with_capacity(inputs.len());
        for batch in inputs.chunks(self.embed_batch_size) {
            let embedded = embedder.embed(batch).await?;
            if embedded.len() != batch.len() {
                return Err(ReadmeError::Upstream(format!(
                    "embedder returned {} vectors for {} inputs",
                    embedded.len(),
                    batch.len()
                )));
            }
            vectors.extend(embedded);
        }
        debug!(inputs = inputs.len(), batch_size = self.embed_batch_size, "references embedded");
        let query_vector = vectors.pop().unwrap_or_default();

        let mut scored: Vec<(usize, f32)> = vectors
            .iter()
            .enumerate()
            .map(|(i, vector)| (i, cosine_similarity(&query_vector, vector)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        let results: Vec<RetrievedExample> = scored
            .into_iter()
            .take(self.k)
            .map(|(i, score)| {
                let example = &corpus.examples()[i];
                RetrievedExample {
                    source: example.source.clone(),
                    excerpt: self.excerpts.excerpt(&example.text).to_string(),
                    score,
                }
            })
            .collect();

        info!(
            candidates = corpus.len(),
            selected = results.len(),
            "reference examples retrieved"
        );
        Ok(results)
    }
}

/// Cosine similarity; 0.0 if either vector has zero magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}
