//! Condensation of summaries that are too long for a downstream prompt.

use tracing::{info, warn};

use crate::config::PipelineSettings;
use crate::error::Result;
use crate::llm::{complete, LanguageModel};
use crate::prompts;

use super::chunker::{char_len, truncate_chars, TextSplitter};
use super::summarizer::MapReduce;

/// Shrinks summaries with a small-chunk map-reduce, or a single lossy call as a last resort
#[derive(Debug, Clone)]
pub struct Condenser {
    pass: MapReduce,
    threshold: usize,
    ultra_budget: usize,
    ultra_words: usize,
}

impl Condenser {
    /// Builds a condenser from the pipeline settings
    pub fn new(settings: &PipelineSettings) -> Self {
        Self {
            pass: MapReduce::new(
                TextSplitter::new(settings.condense_chunk_size, settings.condense_chunk_overlap),
                prompts::CONDENSE_MAP,
                prompts::CONDENSE_COMBINE,
                settings.reduce_budget,
                settings.max_reduce_depth,
                settings.map_concurrency,
            ),
            threshold: settings.condense_threshold,
            ultra_budget: settings.ultra_condense_budget,
            ultra_words: settings.ultra_condense_words,
        }
    }

    /// True when `summary` is strictly longer than the threshold
    pub fn needs_condensing(&self, summary: &str) -> bool {
        char_len(summary) > self.threshold
    }

    /// Runs the condensation pass unconditionally
    pub async fn condense(&self, model: &dyn LanguageModel, summary: &str) -> Result<String> {
        let condensed = self.pass.run(model, summary).await?;
        info!(
            before = char_len(summary),
            after = char_len(&condensed),
            "summary condensed"
        );
        Ok(condensed)
    }

    /// Condenses `summary` only when it exceeds the threshold
    pub async fn condense_if_needed(
        &self,
        model: &dyn LanguageModel,
        summary: &str,
    ) -> Result<String> {
        if self.needs_condensing(summary) {
            self.condense(model, summary).await
        } else {
            Ok(summary.to_string())
        }
    }

    /// Truncates to the ultra budget and asks for a word-limited summary in one call
    pub async fn ultra_condense(&self, model: &dyn LanguageModel, text: &str) -> Result<String> {
        warn!(
            chars = char_len(text),
            budget = self.ultra_budget,
            "ultra-condensing summary, detail will be lost"
        );
        let prompt = prompts::ultra_condense(truncate_chars(text, self.ultra_budget), self.ultra_words);
        complete(model, &prompt).await
    }
}
