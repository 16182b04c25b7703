//! README composition in the two generation modes.
//!
//! Standard mode condenses an oversized summary, asks for a full README, and
//! on a context-length failure retries once with an ultra-condensed summary
//! and a minimal prompt. Examples mode prepends retrieved reference excerpts
//! and falls back to standard mode when there are none or the prompt overflows.

use tracing::{info, warn};

use crate::config::PipelineSettings;
use crate::error::Result;
use crate::llm::{complete, Embedder, LanguageModel};
use crate::prompts;

use super::chunker::char_len;
use super::condenser::Condenser;
use super::retriever::{ExampleRetriever, ReferenceCorpus, RetrievedExample};

/// Examples selected for one request and the summary they were searched with
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    /// Summary used as the search query and in the examples prompt
    pub query: String,
    /// Closest reference documents, most similar first
    pub examples: Vec<RetrievedExample>,
}

/// Builds README prompts and invokes the model
#[derive(Debug, Clone)]
pub struct Composer {
    condenser: Condenser,
    retriever: ExampleRetriever,
    search_condense_threshold: usize,
}

impl Composer {
    /// Builds a composer from the pipeline settings
    pub fn new(settings: &PipelineSettings) -> Self {
        Self {
            condenser: Condenser::new(settings),
            retriever: ExampleRetriever::new(settings),
            search_condense_threshold: settings.search_condense_threshold,
        }
    }

    /// The condenser shared by both modes
    pub fn condenser(&self) -> &Condenser {
        &self.condenser
    }

    /// Generates a README from the summary alone
    pub async fn compose_standard(&self, model: &dyn LanguageModel, summary: &str) -> Result<String> {
        let condensed = self.condenser.condense_if_needed(model, summary).await?;
        let prompt = prompts::render(prompts::STANDARD_README, &condensed);

        match complete(model, &prompt).await {
            Err(e) if e.is_context_overflow() => {
                warn!("README prompt exceeded the context window, retrying with an ultra-condensed summary: {}", e);
                let ultra = self.condenser.ultra_condense(model, &condensed).await?;
                complete(model, &prompts::render(prompts::MINIMAL_README, &ultra)).await
            }
            other => other,
        }
    }

    /// Finds reference examples for `summary`.
    ///
    /// Returns `None` without any model or embedder call when the corpus is empty.
    /// Summaries of `search_condense_threshold` chars or more are condensed first;
    /// the condensed text is both the search query and the prompt summary.
    pub async fn retrieve(
        &self,
        model: &dyn LanguageModel,
        embedder: &dyn Embedder,
        corpus: &ReferenceCorpus,
        summary: &str,
    ) -> Result<Option<Retrieval>> {
        if corpus.is_empty() {
            info!("no reference examples loaded, using the standard path");
            return Ok(None);
        }

        let query = if char_len(summary) >= self.search_condense_threshold {
            self.condenser.condense(model, summary).await?
        } else {
            summary.to_string()
        };

        let examples = self.retriever.retrieve(embedder, corpus, &query).await?;
        if examples.is_empty() {
            return Ok(None);
        }
        Ok(Some(Retrieval { query, examples }))
    }

    /// Generates a README guided by retrieved examples.
    ///
    /// Without examples this is exactly [`Composer::compose_standard`].
    pub async fn compose_with_examples(
        &self,
        model: &dyn LanguageModel,
        summary: &str,
        retrieval: Option<&Retrieval>,
    ) -> Result<String> {
        let Some(retrieval) = retrieval.filter(|r| !r.examples.is_empty()) else {
            return self.compose_standard(model, summary).await;
        };

        let sections: Vec<String> = retrieval
            .examples
            .iter()
            .map(|example| prompts::example_section(&example.source, &example.excerpt))
            .collect();
        let prompt = prompts::examples_readme(&sections, &retrieval.query);

        match complete(model, &prompt).await {
            Err(e) if e.is_context_overflow() => {
                warn!("examples prompt exceeded the context window, falling back to the standard path: {}", e);
                self.compose_standard(model, summary).await
            }
            other => other,
        }
    }
}
