//! Command handlers for the flashcards CLI.
//!
//! Each command builds the clients it needs once from the final configuration
//! and hands them to the pipeline.

pub mod build;
pub mod generate;
pub mod retrieve;
pub mod stats;

// Re-export command types for convenience
pub use build::BuildCommand;
pub use generate::GenerateCommand;
pub use retrieve::RetrieveCommand;
pub use stats::StatsCommand;

use flashcards_core::{config::AppConfig, AppError, AppResult};
use flashcards_knowledge::{create_provider, EmbeddingConfig, EmbeddingProvider};
use flashcards_llm::{create_client, ClientOptions, LlmClient};
use serde::Serialize;
use std::sync::Arc;

/// Create the configured embedding provider.
pub(crate) fn embedder(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    create_provider(&EmbeddingConfig::from_app_config(config))
}

/// Create the configured language-model client.
pub(crate) fn llm_client(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    create_client(
        &config.llm.provider,
        &ClientOptions {
            endpoint: config.llm.endpoint.clone(),
            api_key: config.llm_api_key(),
            timeout_secs: config.llm.timeout_secs,
        },
    )
}

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let output = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Serialization(format!("JSON serialization failed: {}", e)))?;
    println!("{}", output);
    Ok(())
}

/// First `max_chars` characters of `text`, with an ellipsis when cut.
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview() {
        assert_eq!(preview("kloroplas", 20), "kloroplas");
        assert_eq!(preview("kloroplas", 4), "klor...");
        assert_eq!(preview("énergie", 2), "én...");
        assert_eq!(preview("", 4), "");
    }
}
