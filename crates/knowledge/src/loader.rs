//! Source document loading and text normalization.
//!
//! PDFs yield one record per page; `.txt` and `.md` files are treated as a
//! single page. Files are visited in sorted path order so that ingestion of
//! the same directory always produces the same page sequence.

use crate::types::DocumentPage;
use flashcards_core::{AppError, AppResult};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Supported document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    PlainText,
    Markdown,
}

impl DocumentKind {
    /// Detect the document kind from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::PlainText),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }
}

/// Load every supported document under `dir` as normalized pages.
///
/// Pages that are empty after normalization are dropped. A document that
/// cannot be read is skipped with a warning; an empty result is left for the
/// caller to reject.
pub fn load_documents(dir: &Path) -> AppResult<Vec<DocumentPage>> {
    if !dir.is_dir() {
        return Err(AppError::NoDocumentsFound(dir.to_path_buf()));
    }

    let mut pages = Vec::new();

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(kind) = DocumentKind::from_path(path) else {
            tracing::debug!("Skipping unsupported file: {:?}", path);
            continue;
        };

        match load_document(path, kind) {
            Ok(doc_pages) => {
                tracing::debug!("Loaded {:?}: {} pages", path, doc_pages.len());
                pages.extend(doc_pages);
            }
            Err(e) => tracing::warn!("Skipping {:?}: {}", path, e),
        }
    }

    tracing::info!("Loaded {} pages from {:?}", pages.len(), dir);
    Ok(pages)
}

/// Load one document as normalized, non-empty pages.
pub fn load_document(path: &Path, kind: DocumentKind) -> AppResult<Vec<DocumentPage>> {
    let raw_pages = match kind {
        DocumentKind::Pdf => pdf_extract::extract_text_by_pages(path).map_err(|e| {
            AppError::Knowledge(format!("Failed to extract text from {:?}: {}", path, e))
        })?,
        DocumentKind::PlainText | DocumentKind::Markdown => vec![fs::read_to_string(path)?],
    };

    Ok(raw_pages
        .iter()
        .enumerate()
        .filter_map(|(page, raw)| {
            let text = normalize_whitespace(raw);
            (!text.is_empty()).then(|| DocumentPage {
                source: path.to_path_buf(),
                page: page as u32,
                text,
            })
        })
        .collect())
}

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(
            normalize_whitespace("  Fotosintesis\n\n terjadi\tdi   kloroplas. \r\n"),
            "Fotosintesis terjadi di kloroplas."
        );
        assert_eq!(normalize_whitespace(" \n\t "), "");
    }

    #[test]
    fn test_document_kind_detection() {
        assert_eq!(
            DocumentKind::from_path(Path::new("a/Biologi.PDF")),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("notes.md")),
            Some(DocumentKind::Markdown)
        );
        assert_eq!(DocumentKind::from_path(Path::new("image.png")), None);
        assert_eq!(DocumentKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_load_documents_sorted_and_normalized() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("b.txt"), "kedua\n\ndokumen").unwrap();
        std::fs::write(temp.path().join("a.md"), "# Pertama\n  dokumen ").unwrap();
        std::fs::write(temp.path().join("gambar.png"), [0u8, 1, 2]).unwrap();
        std::fs::write(temp.path().join("kosong.txt"), "   \n").unwrap();

        let pages = load_documents(temp.path()).unwrap();
        assert_eq!(pages.len(), 2);
        assert!(pages[0].source.ends_with("a.md"));
        assert_eq!(pages[0].text, "# Pertama dokumen");
        assert_eq!(pages[0].page, 0);
        assert!(pages[1].source.ends_with("b.txt"));
        assert_eq!(pages[1].text, "kedua dokumen");
    }

    #[test]
    fn test_hidden_entries_skipped() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join(".git")).unwrap();
        std::fs::write(temp.path().join(".git/notes.txt"), "rahasia").unwrap();
        std::fs::write(temp.path().join("materi.txt"), "materi").unwrap();

        let pages = load_documents(temp.path()).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].text, "materi");
    }

    #[test]
    fn test_missing_directory_is_no_documents() {
        let temp = TempDir::new().unwrap();
        let result = load_documents(&temp.path().join("absent"));
        assert!(matches!(result, Err(AppError::NoDocumentsFound(_))));
    }

    #[test]
    fn test_broken_pdf_is_skipped() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("rusak.pdf"), "not a pdf").unwrap();
        std::fs::write(temp.path().join("materi.txt"), "materi").unwrap();

        let pages = load_documents(temp.path()).unwrap();
        assert_eq!(pages.len(), 1);
    }
}
