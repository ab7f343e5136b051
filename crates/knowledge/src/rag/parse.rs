//! Parsing of raw model output into flashcards.
//!
//! Accepted shapes, after stripping an optional Markdown code fence:
//! - a JSON array of `{"term", "definition"}` objects
//! - an object with a single key wrapping such an array (`{"flashcards": [...]}`)
//! - a single card object, read as a one-card list
//!
//! Anything else is `GenerationError::MalformedOutput`. No partial list is
//! ever returned.

use crate::rag::types::Flashcard;
use flashcards_core::GenerationError;
use serde_json::Value;

/// Parse the model's raw text into flashcards.
pub fn parse_flashcards(raw: &str) -> Result<Vec<Flashcard>, GenerationError> {
    let body = strip_code_fence(raw.trim());
    if body.is_empty() {
        return Err(GenerationError::MalformedOutput(
            "model returned no output".to_string(),
        ));
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| GenerationError::MalformedOutput(format!("invalid JSON: {}", e)))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) if map.len() == 1 && map.values().all(Value::is_array) => {
            match map.into_iter().next() {
                Some((_, Value::Array(items))) => items,
                _ => Vec::new(),
            }
        }
        object @ Value::Object(_) => vec![object],
        other => {
            return Err(GenerationError::MalformedOutput(format!(
                "expected a list of flashcards, got {}",
                json_kind(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let card: Flashcard = serde_json::from_value(item).map_err(|e| {
                GenerationError::MalformedOutput(format!("flashcard {}: {}", i + 1, e))
            })?;

            if card.term.trim().is_empty() || card.definition.trim().is_empty() {
                return Err(GenerationError::MalformedOutput(format!(
                    "flashcard {} has an empty term or definition",
                    i + 1
                )));
            }

            Ok(Flashcard {
                term: card.term.trim().to_string(),
                definition: card.definition.trim().to_string(),
            })
        })
        .collect()
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };

    // Drop the info string ("json") on the opening line.
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };

    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(term: &str, definition: &str) -> Flashcard {
        Flashcard {
            term: term.to_string(),
            definition: definition.to_string(),
        }
    }

    #[test]
    fn test_plain_array() {
        let cards = parse_flashcards(
            r#"[{"term": "Kloroplas", "definition": "Organel tempat fotosintesis."}]"#,
        )
        .unwrap();
        assert_eq!(cards, vec![card("Kloroplas", "Organel tempat fotosintesis.")]);
    }

    #[test]
    fn test_empty_array_is_valid() {
        assert!(parse_flashcards("[]").unwrap().is_empty());
    }

    #[test]
    fn test_code_fence_is_stripped() {
        let raw = "```json\n[{\"term\": \"ATP\", \"definition\": \"Molekul energi.\"}]\n```";
        assert_eq!(parse_flashcards(raw).unwrap(), vec![card("ATP", "Molekul energi.")]);
    }

    #[test]
    fn test_wrapper_object() {
        let raw = r#"{"flashcards": [{"term": "DNA", "definition": "Materi genetik."}]}"#;
        assert_eq!(parse_flashcards(raw).unwrap(), vec![card("DNA", "Materi genetik.")]);
    }

    #[test]
    fn test_single_card_object() {
        let raw = r#"{"term": "Stomata", "definition": "Celah pada daun."}"#;
        assert_eq!(parse_flashcards(raw).unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_outputs() {
        for raw in [
            "",
            "Berikut flashcard tentang fotosintesis:",
            r#"[{"term": "Kloroplas"}]"#,
            r#"[{"term": "A", "definition": "B", "extra": "C"}]"#,
            r#"[{"term": "", "definition": "B"}]"#,
            r#"[{"term": 1, "definition": "B"}]"#,
            r#""just a string""#,
            r#"{"a": [], "b": []}"#,
        ] {
            assert!(
                matches!(parse_flashcards(raw), Err(GenerationError::MalformedOutput(_))),
                "accepted: {raw}"
            );
        }
    }
}
