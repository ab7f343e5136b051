//! Index Builder: documents in, persisted similarity index out.
//!
//! A build runs strictly sequentially: load pages, chunk, embed in batches
//! and append each batch to a LanceDB table in a staging directory. Only
//! after every batch succeeded and the manifest was written is the staging
//! directory swapped into place, so readers never see a partial index and a
//! failed build leaves the previous index untouched.

use crate::chunker::chunk_pages;
use crate::config::{retired_dir, staging_dir, BuildOptions};
use crate::embeddings::EmbeddingProvider;
use crate::lancedb_index::LanceDbIndex;
use crate::loader::load_documents;
use crate::manifest::IndexManifest;
use crate::progress::ProgressReporter;
use crate::types::{BuildStats, DocumentChunk};
use crate::vector_index::VectorIndex;
use flashcards_core::{AppError, AppResult};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Builds the similarity index from a documents directory.
#[derive(Debug)]
pub struct IndexBuilder {
    embedder: Arc<dyn EmbeddingProvider>,
    options: BuildOptions,
    progress: ProgressReporter,
}

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, options: BuildOptions) -> Self {
        Self {
            embedder,
            options,
            progress: ProgressReporter::noop(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Run a full build, replacing any existing index on success.
    ///
    /// Fails with `AppError::NoDocumentsFound` before touching the index
    /// location when nothing could be loaded or chunked, and with
    /// `AppError::Embedding` when a batch fails for good.
    pub async fn build(&self) -> AppResult<BuildStats> {
        let start = Instant::now();
        let documents_dir = &self.options.documents_dir;
        let index_dir = &self.options.index_dir;

        if self.options.batch_size == 0 {
            return Err(AppError::Config("batchSize must be positive".to_string()));
        }

        info!(
            "Building index from {:?} into {:?} (provider: {}, model: {})",
            documents_dir,
            index_dir,
            self.embedder.provider_name(),
            self.embedder.model_name()
        );

        let pages = load_documents(documents_dir)?;
        if pages.is_empty() {
            return Err(AppError::NoDocumentsFound(documents_dir.clone()));
        }

        let documents = pages
            .iter()
            .map(|p| p.source.as_path())
            .collect::<BTreeSet<_>>()
            .len() as u32;
        self.progress.loaded(documents as u64, pages.len() as u64);

        let chunks = chunk_pages(&pages, &self.options.chunking)?;
        if chunks.is_empty() {
            return Err(AppError::NoDocumentsFound(documents_dir.clone()));
        }
        self.progress.chunked(chunks.len() as u64);

        let staging = staging_dir(index_dir);
        if staging.exists() {
            debug!("Removing stale staging directory {:?}", staging);
            fs::remove_dir_all(&staging)?;
        }

        let batches = match self.write_staging(&staging, chunks).await {
            Ok(batches) => batches,
            Err(e) => {
                discard_staging(&staging);
                return Err(e);
            }
        };

        let manifest = IndexManifest::new(
            self.embedder.identity(),
            self.options.chunking,
            documents,
            pages.len() as u32,
            batches.chunks,
        );
        if let Err(e) = manifest.save(&staging) {
            discard_staging(&staging);
            return Err(e);
        }

        swap_into_place(&staging, index_dir)?;
        self.progress
            .persisted(batches.chunks as u64, &index_dir.to_string_lossy());

        let duration = start.elapsed();
        info!(
            "Index build completed: {} documents, {} pages, {} chunks in {} batches, {:.2}s",
            documents,
            pages.len(),
            batches.chunks,
            batches.batches,
            duration.as_secs_f64()
        );

        Ok(BuildStats {
            documents,
            pages: pages.len() as u32,
            chunks: batches.chunks,
            batches: batches.batches,
            index_dir: index_dir.clone(),
            duration_secs: duration.as_secs_f64(),
        })
    }

    /// Embed every chunk batch by batch and append it to a fresh table in `staging`.
    async fn write_staging(
        &self,
        staging: &Path,
        chunks: Vec<DocumentChunk>,
    ) -> AppResult<BatchTotals> {
        let batch_size = self.options.batch_size;
        let total_batches = chunks.len().div_ceil(batch_size);
        let mut index: Option<LanceDbIndex> = None;
        let mut totals = BatchTotals::default();

        for (i, batch) in chunks.chunks(batch_size).enumerate() {
            if i > 0 && !self.options.batch_delay.is_zero() {
                debug!("Pausing {:?} before next batch", self.options.batch_delay);
                tokio::time::sleep(self.options.batch_delay).await;
            }

            let embedded = self.embed_batch(batch).await?;

            match index.as_mut() {
                Some(index) => index.add_chunks(&embedded).await?,
                None => {
                    index = Some(
                        LanceDbIndex::create(staging, self.embedder.dimensions(), &embedded)
                            .await?,
                    );
                }
            }

            totals.batches += 1;
            totals.chunks += embedded.len() as u32;
            info!(
                "Embedded batch {}/{} ({} chunks)",
                i + 1,
                total_batches,
                embedded.len()
            );
            self.progress.batch_embedded(
                (i + 1) as u64,
                total_batches as u64,
                self.embedder.model_name(),
            );
        }

        Ok(totals)
    }

    /// Embed one batch, backing off exponentially on explicit rate limits.
    async fn embed_batch(&self, batch: &[DocumentChunk]) -> AppResult<Vec<DocumentChunk>> {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let mut backoff = self.options.initial_backoff;
        let mut attempt = 0u32;

        let vectors = loop {
            match self.embedder.embed_batch(&texts).await {
                Ok(vectors) => break vectors,
                Err(e) if e.is_rate_limited() && attempt < self.options.rate_limit_retries => {
                    attempt += 1;
                    warn!(
                        "Rate limited (attempt {}/{}), retrying in {:?}: {}",
                        attempt, self.options.rate_limit_retries, backoff, e
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
                Err(e) => return Err(e),
            }
        };

        if vectors.len() != batch.len() {
            return Err(AppError::embedding(format!(
                "Expected {} embeddings, got {}",
                batch.len(),
                vectors.len()
            )));
        }

        let dimensions = self.embedder.dimensions();
        batch
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                if vector.len() != dimensions {
                    return Err(AppError::embedding(format!(
                        "Embedding for chunk {} has {} dimensions, expected {}",
                        chunk.id,
                        vector.len(),
                        dimensions
                    )));
                }
                Ok(DocumentChunk {
                    embedding: Some(vector),
                    ..chunk.clone()
                })
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct BatchTotals {
    batches: u32,
    chunks: u32,
}

/// Remove a staging directory left by a failed build. Failure to remove it only warns.
fn discard_staging(staging: &Path) {
    if !staging.exists() {
        return;
    }
    if let Err(e) = fs::remove_dir_all(staging) {
        warn!("Failed to remove staging directory {:?}: {}", staging, e);
    }
}

/// Replace `index_dir` with `staging`, parking the old index until the rename succeeds.
fn swap_into_place(staging: &Path, index_dir: &Path) -> AppResult<()> {
    if let Some(parent) = index_dir.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    if !index_dir.exists() {
        fs::rename(staging, index_dir)?;
        return Ok(());
    }

    let retired = retired_dir(index_dir);
    if retired.exists() {
        fs::remove_dir_all(&retired)?;
    }

    fs::rename(index_dir, &retired)?;
    if let Err(e) = fs::rename(staging, index_dir) {
        warn!("Swap failed, restoring previous index: {}", e);
        fs::rename(&retired, index_dir)?;
        return Err(e.into());
    }

    if let Err(e) = fs::remove_dir_all(&retired) {
        warn!("Failed to remove previous index {:?}: {}", retired, e);
    }

    debug!("Swapped {:?} into {:?}", staging, index_dir);
    Ok(())
}
