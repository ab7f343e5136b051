//! LLM provider factory.
//!
//! Resolves a configured provider name into a ready client.

use crate::client::LlmClient;
use crate::providers::{GeminiClient, OllamaClient};
use crate::types::ProviderType;
use flashcards_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Connection options shared by every provider.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Custom endpoint URL; the provider default is used when absent
    pub endpoint: Option<String>,

    /// API key, for providers that need one
    pub api_key: Option<String>,

    /// Per-request timeout in seconds (0 disables the timeout)
    pub timeout_secs: u64,
}

/// Create an LLM client based on the provider name.
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required
/// API key is missing, and `AppError::Llm` if the HTTP client cannot be built.
pub fn create_client(provider: &str, options: &ClientOptions) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown LLM provider: {}", provider)))?;

    let endpoint = options
        .endpoint
        .as_deref()
        .unwrap_or(provider_type.default_endpoint());
    let timeout = (options.timeout_secs > 0).then(|| Duration::from_secs(options.timeout_secs));

    tracing::debug!(provider = provider_type.as_str(), endpoint, "Creating LLM client");

    match provider_type {
        ProviderType::Ollama => {
            let client = match timeout {
                Some(timeout) => OllamaClient::with_timeout(endpoint, timeout)?,
                None => OllamaClient::with_base_url(endpoint),
            };
            Ok(Arc::new(client))
        }
        ProviderType::Gemini => {
            let api_key = options
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| {
                    AppError::Config("Gemini provider requires an API key".to_string())
                })?;
            let client = match timeout {
                Some(timeout) => GeminiClient::with_timeout(api_key, endpoint, timeout)?,
                None => GeminiClient::with_base_url(api_key, endpoint),
            };
            Ok(Arc::new(client))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", &ClientOptions::default()).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint() {
        let options = ClientOptions {
            endpoint: Some("http://localhost:8080".to_string()),
            timeout_secs: 5,
            ..Default::default()
        };
        assert!(create_client("ollama", &options).is_ok());
    }

    #[test]
    fn test_gemini_requires_api_key() {
        match create_client("gemini", &ClientOptions::default()) {
            Err(AppError::Config(msg)) => assert!(msg.contains("API key")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("Expected error for Gemini without API key"),
        }
    }

    #[test]
    fn test_create_gemini_client() {
        let options = ClientOptions {
            api_key: Some("test-key".to_string()),
            timeout_secs: 30,
            ..Default::default()
        };
        let client = create_client("gemini", &options).unwrap();
        assert_eq!(client.provider_name(), "gemini");
    }

    #[test]
    fn test_unknown_provider() {
        assert!(matches!(
            create_client("unknown", &ClientOptions::default()),
            Err(AppError::Config(_))
        ));
    }
}
