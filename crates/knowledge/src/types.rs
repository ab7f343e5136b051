//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One loaded page of a source document, whitespace-normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPage {
    /// Path of the source file
    pub source: PathBuf,

    /// Zero-based page number (always 0 for plain-text documents)
    pub page: u32,

    /// Normalized page text
    pub text: String,
}

/// A text chunk, the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Deterministic chunk identifier (SHA-256 of source, page, position and text)
    pub id: String,

    /// Source file path as it was discovered during ingestion
    pub source: String,

    /// Zero-based page number within the source
    pub page: u32,

    /// Position of the chunk within its page
    pub position: u32,

    /// Text content (non-empty, whitespace-normalized)
    pub text: String,

    /// Embedding vector; absent until the chunk has been embedded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl DocumentChunk {
    /// File name of the source, for citations.
    pub fn source_name(&self) -> String {
        Path::new(&self.source)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.source.clone())
    }

    /// One-indexed page number, for citations.
    pub fn display_page(&self) -> u32 {
        self.page + 1
    }
}

/// A retrieved chunk with its cosine similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Ordered chunks returned for a query.
///
/// Every chunk scores at or above `threshold`, best first. An empty result is
/// a valid outcome, distinct from a missing index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// The query that was embedded
    pub query: String,

    /// Threshold the chunks were filtered with
    pub threshold: f32,

    /// Matching chunks, descending by score
    pub chunks: Vec<ScoredChunk>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Best score, if anything matched.
    pub fn max_score(&self) -> Option<f32> {
        self.chunks.first().map(|c| c.score)
    }

    /// Chunk texts in retrieval order, separated by blank lines.
    pub fn context_block(&self) -> String {
        self.chunks
            .iter()
            .map(|c| c.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Statistics from an index build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStats {
    /// Number of source files that contributed at least one page
    pub documents: u32,

    /// Number of non-empty pages loaded
    pub pages: u32,

    /// Number of chunks embedded and indexed
    pub chunks: u32,

    /// Number of embedding batches sent
    pub batches: u32,

    /// Where the index was written
    pub index_dir: PathBuf,

    /// Duration in seconds
    pub duration_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> DocumentChunk {
        DocumentChunk {
            id: "id".to_string(),
            source: "documents/biologi/sel.pdf".to_string(),
            page: 2,
            position: 0,
            text: text.to_string(),
            embedding: None,
        }
    }

    #[test]
    fn test_citation_helpers() {
        let c = chunk("Kloroplas");
        assert_eq!(c.source_name(), "sel.pdf");
        assert_eq!(c.display_page(), 3);
    }

    #[test]
    fn test_context_block_preserves_order() {
        let result = RetrievalResult {
            query: "Fotosintesis".to_string(),
            threshold: 0.7,
            chunks: vec![
                ScoredChunk {
                    chunk: chunk("pertama"),
                    score: 0.9,
                },
                ScoredChunk {
                    chunk: chunk("kedua"),
                    score: 0.8,
                },
            ],
        };

        assert_eq!(result.context_block(), "pertama\n\nkedua");
        assert_eq!(result.max_score(), Some(0.9));
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_empty_result() {
        let result = RetrievalResult {
            query: "Kosmologi".to_string(),
            threshold: 0.7,
            chunks: Vec::new(),
        };

        assert!(result.is_empty());
        assert_eq!(result.context_block(), "");
        assert_eq!(result.max_score(), None);
    }
}
