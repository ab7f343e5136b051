//! Retrieval-augmented flashcard pipeline.
//!
//! Two phases share one persisted LanceDB index:
//! - **Ingestion**: [`loader`] reads PDF, text and Markdown pages, [`chunker`]
//!   splits them, and [`IndexBuilder`] embeds the chunks in paced batches and
//!   swaps the finished index into place.
//! - **Query**: [`Retriever`] embeds a topic and returns the chunks above the
//!   similarity threshold; [`FlashcardGenerator`] turns them into
//!   term/definition cards through the language model.

pub mod builder;
pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod lancedb_index;
pub mod loader;
pub mod manifest;
pub mod progress;
pub mod rag;
pub mod retriever;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use builder::IndexBuilder;
pub use config::{BuildOptions, ChunkingOptions, RetrievalOptions};
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingIdentity, EmbeddingProvider};
pub use manifest::IndexManifest;
pub use progress::{BuildPhase, ProgressEvent, ProgressReporter};
pub use rag::{parse_flashcards, Flashcard, FlashcardGenerator, FlashcardSet, GenerationOptions};
pub use retriever::Retriever;
pub use types::{BuildStats, DocumentChunk, DocumentPage, RetrievalResult, ScoredChunk};
pub use vector_index::VectorIndex;

use flashcards_core::AppResult;
use std::path::Path;

/// On-disk summary of a built index.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IndexStats {
    pub manifest: IndexManifest,

    /// Total size of the index directory in bytes
    pub size_bytes: u64,
}

/// Read the manifest and measure the index at `index_dir`.
pub fn index_stats(index_dir: &Path) -> AppResult<IndexStats> {
    let manifest = IndexManifest::load(index_dir)?;
    let size_bytes = walkdir::WalkDir::new(index_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .sum();

    Ok(IndexStats {
        manifest,
        size_bytes,
    })
}
