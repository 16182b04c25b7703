//! The summarization pipeline: chunk, map-reduce, condense, retrieve, compose.

/// Semantic-first overlapping splitter
pub mod chunker;
/// Condensation of oversized summaries
pub mod condenser;
/// README prompt construction and generation
pub mod composer;
/// Reference README similarity search
pub mod retriever;
/// Map-reduce over chunks
pub mod summarizer;

pub use chunker::{Chunk, TextSplitter};
pub use composer::{Composer, Retrieval};
pub use condenser::Condenser;
pub use retriever::{ExampleRetriever, ReferenceCorpus, ReferenceExample, RetrievedExample};
pub use summarizer::{summarize_corpus, MapReduce};
