//! Gemini embedding provider.
//!
//! Calls the Generative Language `batchEmbedContents` endpoint. Documents are
//! embedded with task type `RETRIEVAL_DOCUMENT` and queries with
//! `RETRIEVAL_QUERY`.

use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use flashcards_core::{AppError, AppResult};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: TaskType,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

/// An [`EmbeddingProvider`] backed by the Gemini embedding API.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    /// Fully qualified model name ("models/embedding-001")
    model: String,
    dimensions: usize,
}

impl GeminiProvider {
    /// Create a provider from configuration. Requires an API key.
    pub fn new(config: &EmbeddingConfig) -> AppResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("Gemini embedding provider requires an API key".to_string())
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                AppError::embedding(format!("Failed to create HTTP client for Gemini: {}", e))
            })?;

        let model = if config.model.starts_with("models/") {
            config.model.clone()
        } else {
            format!("models/{}", config.model)
        };

        Ok(Self {
            client,
            base_url: config
                .endpoint
                .as_deref()
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model,
            dimensions: config.dimensions,
        })
    }

    fn build_request<'a>(&'a self, texts: &'a [String], task_type: TaskType) -> BatchEmbedRequest<'a> {
        BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: &self.model,
                    content: Content {
                        parts: [Part { text }],
                    },
                    task_type,
                })
                .collect(),
        }
    }

    async fn batch_embed(&self, texts: &[String], task_type: TaskType) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/{}:batchEmbedContents", self.base_url, self.model);
        debug!(provider = "gemini", batch_size = texts.len(), "embedding batch");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.build_request(texts, task_type))
            .send()
            .await
            .map_err(|e| {
                error!(provider = "gemini", error = %e, "batch embedding request failed");
                AppError::embedding(format!("Failed to send request to Gemini: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_error(status, &error_text));
        }

        let body: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::embedding(format!("Failed to parse Gemini response: {}", e)))?;

        self.collect_vectors(body, texts.len())
    }

    fn collect_vectors(&self, body: BatchEmbedResponse, expected: usize) -> AppResult<Vec<Vec<f32>>> {
        if body.embeddings.len() != expected {
            return Err(AppError::embedding(format!(
                "Gemini returned {} embeddings for {} texts",
                body.embeddings.len(),
                expected
            )));
        }

        body.embeddings
            .into_iter()
            .map(|e| {
                if e.values.len() == self.dimensions {
                    Ok(e.values)
                } else {
                    Err(AppError::embedding(format!(
                        "Gemini model '{}' returned {} dimensions, expected {}",
                        self.model,
                        e.values.len(),
                        self.dimensions
                    )))
                }
            })
            .collect()
    }
}

/// Map a failed response to an embedding error, flagging explicit rate limits.
fn classify_error(status: StatusCode, body: &str) -> AppError {
    let message = format!("Gemini API error ({}): {}", status, body);
    if status == StatusCode::TOO_MANY_REQUESTS || body.contains("RESOURCE_EXHAUSTED") {
        AppError::rate_limited(message)
    } else {
        AppError::embedding(message)
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiProvider {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "gemini"))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.batch_embed(texts, TaskType::RetrievalDocument).await
    }

    async fn embed_query(&self, text: &str) -> AppResult<Vec<f32>> {
        self.batch_embed(&[text.to_string()], TaskType::RetrievalQuery)
            .await?
            .pop()
            .ok_or_else(|| AppError::embedding("No embedding returned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(model: &str) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: "gemini".to_string(),
            model: model.to_string(),
            dimensions: 3,
            endpoint: None,
            api_key: Some("test-key".to_string()),
        }
    }

    #[test]
    fn test_model_name_is_qualified() {
        let provider = GeminiProvider::new(&config("embedding-001")).unwrap();
        assert_eq!(provider.model_name(), "models/embedding-001");

        let provider = GeminiProvider::new(&config("models/embedding-001")).unwrap();
        assert_eq!(provider.model_name(), "models/embedding-001");
    }

    #[test]
    fn test_missing_api_key() {
        let mut cfg = config("embedding-001");
        cfg.api_key = Some("  ".to_string());
        assert!(matches!(GeminiProvider::new(&cfg), Err(AppError::Config(_))));
    }

    #[test]
    fn test_request_shape() {
        let provider = GeminiProvider::new(&config("models/embedding-001")).unwrap();
        let texts = vec!["Fotosintesis".to_string()];
        let body =
            serde_json::to_value(provider.build_request(&texts, TaskType::RetrievalQuery)).unwrap();

        let request = &body["requests"][0];
        assert_eq!(request["model"], "models/embedding-001");
        assert_eq!(request["content"]["parts"][0]["text"], "Fotosintesis");
        assert_eq!(request["taskType"], "RETRIEVAL_QUERY");
    }

    #[test]
    fn test_rate_limit_classification() {
        assert!(classify_error(StatusCode::TOO_MANY_REQUESTS, "slow down").is_rate_limited());
        assert!(
            classify_error(StatusCode::BAD_REQUEST, "{\"status\":\"RESOURCE_EXHAUSTED\"}")
                .is_rate_limited()
        );
        assert!(!classify_error(StatusCode::UNAUTHORIZED, "bad key").is_rate_limited());
    }

    #[test]
    fn test_response_dimension_check() {
        let provider = GeminiProvider::new(&config("embedding-001")).unwrap();
        let ok: BatchEmbedResponse =
            serde_json::from_value(serde_json::json!({"embeddings": [{"values": [0.1, 0.2, 0.3]}]}))
                .unwrap();
        assert_eq!(provider.collect_vectors(ok, 1).unwrap()[0].len(), 3);

        let short: BatchEmbedResponse =
            serde_json::from_value(serde_json::json!({"embeddings": [{"values": [0.1]}]})).unwrap();
        assert!(provider.collect_vectors(short, 1).is_err());

        let missing: BatchEmbedResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(provider.collect_vectors(missing, 2).is_err());
    }
}
