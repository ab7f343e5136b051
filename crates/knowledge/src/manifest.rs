//! The `index.json` manifest persisted next to the LanceDB data.
//!
//! The manifest is the marker of a complete index: it is written last into the
//! staging directory, so an index directory without one was never finished.

use crate::config::{manifest_path, ChunkingOptions};
use crate::embeddings::EmbeddingIdentity;
use chrono::{DateTime, Utc};
use flashcards_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current manifest layout version.
pub const MANIFEST_VERSION: u32 = 1;

/// Build metadata of a persisted index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexManifest {
    pub format_version: u32,

    /// Vector space the chunks were embedded in
    pub embedding: EmbeddingIdentity,

    pub chunk_size: usize,
    pub chunk_overlap: usize,

    pub documents: u32,
    pub pages: u32,
    pub chunks: u32,

    pub built_at: DateTime<Utc>,
}

impl IndexManifest {
    pub fn new(
        embedding: EmbeddingIdentity,
        chunking: ChunkingOptions,
        documents: u32,
        pages: u32,
        chunks: u32,
    ) -> Self {
        Self {
            format_version: MANIFEST_VERSION,
            embedding,
            chunk_size: chunking.chunk_size,
            chunk_overlap: chunking.chunk_overlap,
            documents,
            pages,
            chunks,
            built_at: Utc::now(),
        }
    }

    /// Load the manifest of the index at `index_dir`.
    ///
    /// A missing manifest means there is no usable index: `AppError::IndexNotFound`.
    pub fn load(index_dir: &Path) -> AppResult<Self> {
        let path = manifest_path(index_dir);
        if !path.is_file() {
            return Err(AppError::IndexNotFound(index_dir.to_path_buf()));
        }

        let content = std::fs::read_to_string(&path)?;
        let manifest: IndexManifest = serde_json::from_str(&content).map_err(|e| {
            AppError::Knowledge(format!("Failed to parse manifest {:?}: {}", path, e))
        })?;

        if manifest.format_version != MANIFEST_VERSION {
            return Err(AppError::IndexMismatch(format!(
                "index format version {} is not supported (expected {}); rebuild the index",
                manifest.format_version, MANIFEST_VERSION
            )));
        }

        Ok(manifest)
    }

    /// Write the manifest into `index_dir`.
    pub fn save(&self, index_dir: &Path) -> AppResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(manifest_path(index_dir), content)?;
        Ok(())
    }

    /// Reject an embedder whose vector space differs from the index's.
    pub fn validate_against(&self, embedder: &EmbeddingIdentity) -> AppResult<()> {
        self.embedding.validate_consistency(embedder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn identity() -> EmbeddingIdentity {
        EmbeddingIdentity {
            provider: "mock".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 256,
        }
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let manifest = IndexManifest::new(identity(), ChunkingOptions::default(), 2, 5, 12);
        manifest.save(temp.path()).unwrap();

        let loaded = IndexManifest::load(temp.path()).unwrap();
        assert_eq!(loaded, manifest);

        let raw = std::fs::read_to_string(temp.path().join("index.json")).unwrap();
        assert!(raw.contains("\"chunkSize\": 1000"));
        assert!(raw.contains("\"builtAt\""));
    }

    #[test]
    fn test_missing_manifest_is_index_not_found() {
        let temp = TempDir::new().unwrap();
        let result = IndexManifest::load(&temp.path().join("flashcard_index"));
        assert!(matches!(result, Err(AppError::IndexNotFound(_))));
    }

    #[test]
    fn test_unsupported_version() {
        let temp = TempDir::new().unwrap();
        let mut manifest = IndexManifest::new(identity(), ChunkingOptions::default(), 1, 1, 1);
        manifest.format_version = 99;
        manifest.save(temp.path()).unwrap();

        let result = IndexManifest::load(temp.path());
        assert!(matches!(result, Err(AppError::IndexMismatch(_))));
    }

    #[test]
    fn test_validate_against() {
        let manifest = IndexManifest::new(identity(), ChunkingOptions::default(), 1, 1, 1);
        assert!(manifest.validate_against(&identity()).is_ok());

        let other = EmbeddingIdentity {
            provider: "gemini".to_string(),
            model: "models/embedding-001".to_string(),
            dimensions: 768,
        };
        assert!(matches!(
            manifest.validate_against(&other),
            Err(AppError::IndexMismatch(_))
        ));
    }
}
