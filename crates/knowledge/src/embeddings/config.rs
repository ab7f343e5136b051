//! Embedding configuration types.

use flashcards_core::config::EmbeddingSettings;
use flashcards_core::{AppError, AppConfig, AppResult};
use serde::{Deserialize, Serialize};

/// Everything needed to construct an embedding provider.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "gemini", "ollama", "mock"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Custom endpoint; the provider default is used when absent
    pub endpoint: Option<String>,

    /// API key, for providers that need one
    pub api_key: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::from_settings(&EmbeddingSettings::default(), None)
    }
}

impl EmbeddingConfig {
    pub fn from_settings(settings: &EmbeddingSettings, api_key: Option<String>) -> Self {
        Self {
            provider: settings.provider.clone(),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            endpoint: settings.endpoint.clone(),
            api_key,
        }
    }

    /// Build from the application config, resolving the API key from the environment.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::from_settings(&config.embedding, config.embedding_api_key())
    }

    /// The part of the configuration that must match a persisted index.
    pub fn identity(&self) -> EmbeddingIdentity {
        EmbeddingIdentity {
            provider: self.provider.clone(),
            model: self.model.clone(),
            dimensions: self.dimensions,
        }
    }
}

/// Identifies the vector space an index was built in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingIdentity {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
}

impl EmbeddingIdentity {
    /// Validate that `other` (the configured embedder) matches this one (the index).
    pub fn validate_consistency(&self, other: &Self) -> AppResult<()> {
        if self.provider != other.provider {
            return Err(AppError::IndexMismatch(format!(
                "index was built with provider '{}', configured provider is '{}'",
                self.provider, other.provider
            )));
        }

        if self.model != other.model {
            return Err(AppError::IndexMismatch(format!(
                "index was built with model '{}', configured model is '{}'",
                self.model, other.model
            )));
        }

        if self.dimensions != other.dimensions {
            return Err(AppError::IndexMismatch(format!(
                "index has {} dimensions, configured embedder produces {}",
                self.dimensions, other.dimensions
            )));
        }

        Ok(())
    }
}
