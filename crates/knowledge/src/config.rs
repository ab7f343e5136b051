//! Ingestion and retrieval options, and the on-disk layout of an index.

use flashcards_core::AppConfig;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// LanceDB table holding the chunks.
pub const TABLE_NAME: &str = "chunks";

/// Manifest file stored next to the LanceDB data.
pub const MANIFEST_FILE: &str = "index.json";

/// First wait after a rate-limited batch; doubles on every retry.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 2000;

/// Chunk size and overlap, both counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
        }
    }
}

/// Options for an index build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Directory scanned for source documents
    pub documents_dir: PathBuf,

    /// Destination of the persisted index
    pub index_dir: PathBuf,

    pub chunking: ChunkingOptions,

    /// Chunks per embedding request
    pub batch_size: usize,

    /// Pause between consecutive batches
    pub batch_delay: Duration,

    /// Retries for a batch that was explicitly rate limited
    pub rate_limit_retries: u32,

    /// Backoff before the first retry
    pub initial_backoff: Duration,
}

impl BuildOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        let k = &config.knowledge;
        Self {
            documents_dir: config.documents_dir(),
            index_dir: config.index_dir(),
            chunking: ChunkingOptions {
                chunk_size: k.chunk_size,
                chunk_overlap: k.chunk_overlap,
            },
            batch_size: k.batch_size,
            batch_delay: Duration::from_millis(k.batch_delay_ms),
            rate_limit_retries: k.rate_limit_retries,
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
        }
    }
}

/// Options for querying an index.
#[derive(Debug, Clone)]
pub struct RetrievalOptions {
    pub index_dir: PathBuf,

    /// Minimum cosine similarity for a chunk to be returned
    pub score_threshold: f32,

    /// Maximum number of chunks to return
    pub top_k: usize,
}

impl RetrievalOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            index_dir: config.index_dir(),
            score_threshold: config.knowledge.score_threshold,
            top_k: config.knowledge.top_k,
        }
    }
}

/// Get the manifest path of an index.
pub fn manifest_path(index_dir: &Path) -> PathBuf {
    index_dir.join(MANIFEST_FILE)
}

/// Sibling directory an index is built in before being swapped into place.
pub fn staging_dir(index_dir: &Path) -> PathBuf {
    sibling(index_dir, ".staging")
}

/// Sibling directory the previous index is parked in during the swap.
pub fn retired_dir(index_dir: &Path) -> PathBuf {
    sibling(index_dir, ".old")
}

fn sibling(index_dir: &Path, suffix: &str) -> PathBuf {
    let mut name = index_dir
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("index"));
    name.push(suffix);
    index_dir.with_file_name(name)
}
