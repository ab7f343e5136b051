//! Flashcard generation result types.

use crate::types::RetrievalResult;
use serde::{Deserialize, Serialize};

/// One term/definition pair.
///
/// Exactly the two string fields; anything else in the model output is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Flashcard {
    pub term: String,
    pub definition: String,
}

/// Generated flashcards together with the context they were generated from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashcardSet {
    /// Requested topic
    pub topic: String,

    /// Parsed cards, possibly empty
    pub flashcards: Vec<Flashcard>,

    /// Retrieval used as context, for source citations
    pub sources: RetrievalResult,

    /// True when nothing was retrieved and the model was not called
    pub empty_retrieval: bool,
}

impl FlashcardSet {
    pub fn is_empty(&self) -> bool {
        self.flashcards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flashcard_rejects_extra_fields() {
        let ok: Result<Flashcard, _> =
            serde_json::from_str(r#"{"term": "Kloroplas", "definition": "Organel sel"}"#);
        assert!(ok.is_ok());

        let extra: Result<Flashcard, _> = serde_json::from_str(
            r#"{"term": "Kloroplas", "definition": "Organel sel", "example": "daun"}"#,
        );
        assert!(extra.is_err());
    }

    #[test]
    fn test_set_serializes_sources() {
        let set = FlashcardSet {
            topic: "Fotosintesis".to_string(),
            flashcards: vec![Flashcard {
                term: "Kloroplas".to_string(),
                definition: "Tempat fotosintesis".to_string(),
            }],
            sources: RetrievalResult {
                query: "Fotosintesis".to_string(),
                threshold: 0.7,
                chunks: Vec::new(),
            },
            empty_retrieval: false,
        };

        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["flashcards"][0]["term"], "Kloroplas");
        assert_eq!(json["sources"]["query"], "Fotosintesis");
        assert!(!set.is_empty());
    }
}
