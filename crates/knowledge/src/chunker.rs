//! Text chunking with configurable size and overlap.
//!
//! Uses `text-splitter`, which prefers sentence and word boundaries and
//! never emits a chunk longer than the configured number of characters.

use crate::config::ChunkingOptions;
use crate::types::{DocumentChunk, DocumentPage};
use flashcards_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use text_splitter::{ChunkConfig, TextSplitter};

/// Split pages into overlapping chunks, keeping source and page metadata.
///
/// Output order follows page order, then position within the page.
pub fn chunk_pages(pages: &[DocumentPage], options: &ChunkingOptions) -> AppResult<Vec<DocumentChunk>> {
    let config = ChunkConfig::new(options.chunk_size)
        .with_overlap(options.chunk_overlap)
        .map_err(|e| AppError::Config(format!("Invalid chunking options: {}", e)))?;
    let splitter = TextSplitter::new(config);

    let mut chunks = Vec::new();

    for page in pages {
        let source = page.source.to_string_lossy().to_string();

        for (position, text) in splitter
            .chunks(&page.text)
            .filter(|t| !t.trim().is_empty())
            .enumerate()
        {
            let position = position as u32;
            chunks.push(DocumentChunk {
                id: chunk_id(&source, page.page, position, text),
                source: source.clone(),
                page: page.page,
                position,
                text: text.to_string(),
                embedding: None,
            });
        }
    }

    tracing::debug!(
        "Chunked {} pages into {} chunks (size: {}, overlap: {})",
        pages.len(),
        chunks.len(),
        options.chunk_size,
        options.chunk_overlap
    );

    Ok(chunks)
}

/// Deterministic chunk identifier.
pub fn chunk_id(source: &str, page: u32, position: u32, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(page.to_le_bytes());
    hasher.update(position.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
