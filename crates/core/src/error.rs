//! Error types for the flashcards pipeline.
//!
//! This module defines a unified error enum covering configuration, I/O,
//! the embedding and language-model boundaries, the similarity index and
//! flashcard generation.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for the flashcards pipeline.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic; errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Language-model provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding service failures. `rate_limited` is set when the service
    /// explicitly signalled a rate limit.
    #[error("Embedding service error: {message}")]
    Embedding { message: String, rate_limited: bool },

    /// Ingestion found nothing to index
    #[error("No documents found in {0:?}")]
    NoDocumentsFound(PathBuf),

    /// Query attempted before any successful ingestion
    #[error("Index not found at {0:?}. Run `flashcards build` first.")]
    IndexNotFound(PathBuf),

    /// Persisted index was built with a different embedding model
    #[error("Index mismatch: {0}")]
    IndexMismatch(String),

    /// Generic similarity index / document errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Flashcard generation failed
    #[error("Failed to generate flashcards: {0}")]
    Generation(#[from] GenerationError),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Invalid user input
    #[error("Invalid input: {0}")]
    Input(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// Why a generation request failed.
///
/// Both variants surface to users as a single "failed to generate" outcome,
/// but stay distinct for logs and tests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The model call itself failed (network, auth, quota)
    #[error("model invocation failed: {0}")]
    ModelInvocation(String),

    /// The model answered, but not in the expected card shape
    #[error("malformed model output: {0}")]
    MalformedOutput(String),
}

impl AppError {
    /// Transient or persistent embedding failure.
    pub fn embedding(message: impl Into<String>) -> Self {
        AppError::Embedding {
            message: message.into(),
            rate_limited: false,
        }
    }

    /// Embedding failure caused by an explicit rate-limit signal.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        AppError::Embedding {
            message: message.into(),
            rate_limited: true,
        }
    }

    /// Whether this error is an explicit rate-limit signal from a service.
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            AppError::Embedding {
                rate_limited: true,
                ..
            }
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_flag() {
        assert!(AppError::rate_limited("429").is_rate_limited());
        assert!(!AppError::embedding("boom").is_rate_limited());
        assert!(!AppError::Llm("boom".to_string()).is_rate_limited());
    }

    #[test]
    fn test_generation_message_is_unified() {
        let invocation: AppError = GenerationError::ModelInvocation("timeout".into()).into();
        let malformed: AppError = GenerationError::MalformedOutput("not json".into()).into();

        assert!(invocation
            .to_string()
            .starts_with("Failed to generate flashcards"));
        assert!(malformed
            .to_string()
            .starts_with("Failed to generate flashcards"));
    }

    #[test]
    fn test_index_not_found_mentions_build() {
        let err = AppError::IndexNotFound(PathBuf::from("flashcard_index"));
        assert!(err.to_string().contains("flashcards build"));
    }
}
