//! Retriever: top-k similarity search over a persisted index.

use crate::config::RetrievalOptions;
use crate::embeddings::EmbeddingProvider;
use crate::lancedb_index::LanceDbIndex;
use crate::manifest::IndexManifest;
use crate::types::RetrievalResult;
use crate::vector_index::VectorIndex;
use flashcards_core::{AppError, AppResult};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Answers queries against one loaded index.
///
/// Holds the embedder it was opened with; the embedder must match the one
/// the index was built with.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Box<dyn VectorIndex>,
    manifest: Option<IndexManifest>,
    options: RetrievalOptions,
}

impl Retriever {
    /// Open the persisted index at `options.index_dir`.
    ///
    /// Fails with `AppError::IndexNotFound` when no complete index exists and
    /// with `AppError::IndexMismatch` when it was built in another vector space.
    pub async fn open(
        embedder: Arc<dyn EmbeddingProvider>,
        options: RetrievalOptions,
    ) -> AppResult<Self> {
        let manifest = IndexManifest::load(&options.index_dir)?;
        manifest.validate_against(&embedder.identity())?;

        let index = LanceDbIndex::open(&options.index_dir, embedder.dimensions()).await?;

        info!(
            "Opened index at {:?}: {} chunks, model {}",
            options.index_dir, manifest.chunks, manifest.embedding.model
        );

        Ok(Self {
            embedder,
            index: Box::new(index),
            manifest: Some(manifest),
            options,
        })
    }

    /// Use an already opened index, skipping the manifest check.
    pub fn with_index(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Box<dyn VectorIndex>,
        options: RetrievalOptions,
    ) -> Self {
        Self {
            embedder,
            index,
            manifest: None,
            options,
        }
    }

    /// Manifest of the opened index, when opened from disk.
    pub fn manifest(&self) -> Option<&IndexManifest> {
        self.manifest.as_ref()
    }

    pub fn options(&self) -> &RetrievalOptions {
        &self.options
    }

    /// Retrieve at most `top_k` chunks scoring at or above the threshold, best first.
    ///
    /// An empty result is a valid outcome.
    #[instrument(skip(self), fields(top_k = self.options.top_k, threshold = self.options.score_threshold))]
    pub async fn retrieve(&self, query: &str) -> AppResult<RetrievalResult> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::Input("Query must not be empty".to_string()));
        }

        let query_embedding = self.embedder.embed_query(query).await?;
        let mut chunks = self
            .index
            .search(&query_embedding, self.options.top_k)
            .await?;

        debug!(
            "Scores before filtering: {:?}",
            chunks.iter().map(|c| c.score).collect::<Vec<_>>()
        );

        chunks.retain(|c| c.score >= self.options.score_threshold);
        chunks.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        chunks.truncate(self.options.top_k);
        for scored in &mut chunks {
            scored.chunk.embedding = None;
        }

        let result = RetrievalResult {
            query: query.to_string(),
            threshold: self.options.score_threshold,
            chunks,
        };

        match result.max_score() {
            Some(max) => info!("Retrieved {} chunks (top score: {:.3})", result.len(), max),
            None => info!(
                "No chunks at or above threshold {:.2}",
                self.options.score_threshold
            ),
        }

        Ok(result)
    }
}
