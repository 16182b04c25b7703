//! Map-reduce summarization.
//!
//! Each chunk is summarized independently (map), then the partial summaries
//! are packed into batches that fit the reduce budget and combined (reduce).
//! Reduction repeats until a single summary remains or the depth cap is
//! reached, at which point everything left is combined in one lossy call.

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt, TryStreamExt};
use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::config::PipelineSettings;
use crate::error::Result;
use crate::llm::{complete, LanguageModel};
use crate::prompts;

use super::chunker::{char_len, truncate_chars, TextSplitter};

const PARTIAL_SEPARATOR: &str = "\n\n";

/// A configured map-reduce pass: splitter, prompts and limits
#[derive(Debug, Clone)]
pub struct MapReduce {
    splitter: TextSplitter,
    map_prompt: &'static str,
    combine_prompt: &'static str,
    reduce_budget: usize,
    max_depth: usize,
    concurrency: usize,
}

impl MapReduce {
    /// Creates a pass with explicit prompts.
    ///
    /// Budget, depth and concurrency are raised to at least 1.
    pub fn new(
        splitter: TextSplitter,
        map_prompt: &'static str,
        combine_prompt: &'static str,
        reduce_budget: usize,
        max_depth: usize,
        concurrency: usize,
    ) -> Self {
        Self {
            splitter,
            map_prompt,
            combine_prompt,
            reduce_budget: reduce_budget.max(1),
            max_depth: max_depth.max(1),
            concurrency: concurrency.max(1),
        }
    }

    /// The pass that summarizes a whole repository corpus
    pub fn corpus(settings: &PipelineSettings) -> Self {
        Self::new(
            TextSplitter::for_corpus(settings.chunk_size, settings.chunk_overlap),
            prompts::CORPUS_MAP,
            prompts::CORPUS_COMBINE,
            settings.reduce_budget,
            settings.max_reduce_depth,
            settings.map_concurrency,
        )
    }

    /// The splitter used by the map stage
    pub fn splitter(&self) -> &TextSplitter {
        &self.splitter
    }

    /// Summarizes `text` into a single string.
    ///
    /// Empty or blank input yields an empty summary without calling the model.
    /// A text that fits one chunk costs exactly one call.
    pub async fn run(&self, model: &dyn LanguageModel, text: &str) -> Result<String> {
        let chunks: Vec<&str> = self
            .splitter
            .chunks(text)
            .map(|chunk| chunk.text)
            .filter(|chunk| !chunk.trim().is_empty())
            .collect();

        if chunks.is_empty() {
            debug!("nothing to summarize");
            return Ok(String::new());
        }

        info!(chunks = chunks.len(), chars = char_len(text), "map stage");
        let partials = self.map(model, &chunks).await?;
        let partials: Vec<String> = partials.into_iter().filter(|p| !p.is_empty()).collect();

        match partials.len() {
            0 => Ok(String::new()),
            1 => Ok(partials.into_iter().next().unwrap_or_default()),
            _ => self.reduce(model, partials, 1).await,
        }
    }

    /// One call per chunk, at most `concurrency` in flight, results in chunk order
    async fn map(&self, model: &dyn LanguageModel, chunks: &[&str]) -> Result<Vec<String>> {
        let requests: Vec<String> = chunks
            .iter()
            .map(|chunk| prompts::render(self.map_prompt, chunk))
            .collect();

        stream::iter(requests)
            .map(|prompt| async move { complete(model, &prompt).await })
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    fn reduce<'a>(
        &'a self,
        model: &'a dyn LanguageModel,
        partials: Vec<String>,
        depth: usize,
    ) -> BoxFuture<'a, Result<String>> {
        async move {
            if depth >= self.max_depth {
                warn!(
                    depth,
                    partials = partials.len(),
                    "reduce depth limit reached, combining truncated remainder"
                );
                let joined = partials.join(PARTIAL_SEPARATOR);
                let prompt = prompts::render(
                    self.combine_prompt,
                    truncate_chars(&joined, self.reduce_budget),
                );
                return complete(model, &prompt).await;
            }

            let batches = pack_batches(&partials, self.reduce_budget);
            debug!(depth, partials = partials.len(), batches = batches.len(), "reduce stage");

            let requests: Vec<String> = batches
                .iter()
                .map(|batch| prompts::render(self.combine_prompt, batch))
                .collect();

            let combined: Vec<String> = stream::iter(requests)
                .map(|prompt| async move { complete(model, &prompt).await })
                .buffered(self.concurrency)
                .try_collect()
                .await?;

            let mut combined: Vec<String> =
                combined.into_iter().filter(|c| !c.is_empty()).collect();
            match combined.len() {
                0 => Ok(String::new()),
                1 => Ok(combined.remove(0)),
                _ => self.reduce(model, combined, depth + 1).await,
            }
        }
        .boxed()
    }
}

/// Greedily packs partials, in order, into joined batches of at most `budget` chars.
///
/// A partial longer than the budget is truncated and forms a batch of its own.
pub fn pack_batches(partials: &[String], budget: usize) -> Vec<String> {
    let separator_len = char_len(PARTIAL_SEPARATOR);
    let mut batches = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for partial in partials {
        let piece = truncate_chars(partial, budget);
        let piece_len = char_len(piece);
        if piece.len() < partial.len() {
            warn!(
                partial_chars = char_len(partial),
                budget,
                "partial summary exceeds the reduce budget, truncating"
            );
        }

        if !current.is_empty() && current_len + separator_len + piece_len > budget {
            batches.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push_str(PARTIAL_SEPARATOR);
            current_len += separator_len;
        }
        current.push_str(piece);
        current_len += piece_len;
    }

    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Summarizes a repository corpus with the corpus prompts
pub async fn summarize_corpus(
    model: &dyn LanguageModel,
    settings: &PipelineSettings,
    corpus: &str,
) -> Result<String> {
    MapReduce::corpus(settings).run(model, corpus).await
}
