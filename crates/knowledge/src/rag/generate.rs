//! Generation Pipeline: topic in, grounded flashcards out.
//!
//! Retrieves context for the topic, fills the few-shot prompt, asks the model
//! for JSON and parses it. Model-call and parse failures become
//! `AppError::Generation` with no partial result.

use crate::rag::parse::parse_flashcards;
use crate::rag::types::FlashcardSet;
use crate::retriever::Retriever;
use flashcards_core::config::{GenerationSettings, LlmSettings};
use flashcards_core::{AppError, AppResult, GenerationError};
use flashcards_llm::{LlmClient, LlmRequest};
use flashcards_prompt::{build_prompt, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Model parameters and pipeline switches.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,

    /// Return an empty set without calling the model when retrieval is empty
    pub skip_on_empty_context: bool,
}

impl GenerationOptions {
    pub fn from_settings(llm: &LlmSettings, generation: &GenerationSettings) -> Self {
        Self {
            model: llm.model.clone(),
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            skip_on_empty_context: generation.skip_on_empty_context,
        }
    }
}

/// The query-phase pipeline. Constructed once and reused across topics.
pub struct FlashcardGenerator {
    retriever: Retriever,
    llm: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    options: GenerationOptions,
}

impl FlashcardGenerator {
    pub fn new(
        retriever: Retriever,
        llm: Arc<dyn LlmClient>,
        prompt: PromptDefinition,
        options: GenerationOptions,
    ) -> Self {
        Self {
            retriever,
            llm,
            prompt,
            options,
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Generate flashcards for `topic`.
    ///
    /// Errors: `Input` for a blank topic, retrieval errors as-is
    /// (`IndexNotFound`, `Embedding`), and `Generation` for a failed model
    /// call or malformed output.
    #[instrument(skip(self), fields(provider = self.llm.provider_name(), model = %self.options.model))]
    pub async fn generate(&self, topic: &str) -> AppResult<FlashcardSet> {
        let start = Instant::now();
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(AppError::Input("Topic must not be empty".to_string()));
        }

        let sources = self.retriever.retrieve(topic).await?;

        if sources.is_empty() && self.options.skip_on_empty_context {
            info!("No context retrieved for '{}', skipping model call", topic);
            return Ok(FlashcardSet {
                topic: topic.to_string(),
                flashcards: Vec::new(),
                sources,
                empty_retrieval: true,
            });
        }

        let mut variables = HashMap::new();
        variables.insert("topic".to_string(), topic.to_string());
        variables.insert("context".to_string(), sources.context_block());
        let prompt = build_prompt(&self.prompt, variables)?;

        let mut request = LlmRequest::new(prompt.user, self.options.model.clone());
        if prompt.metadata.json_output {
            request = request.with_json_output();
        }
        if let Some(temperature) = self.options.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.options.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        debug!(
            "Generation request ({}, language: {}):\n{}",
            prompt.metadata.source_prompt_id, prompt.metadata.language, request.prompt
        );

        let response = self.llm.complete(&request).await.map_err(|e| {
            warn!("Model invocation failed: {}", e);
            GenerationError::ModelInvocation(e.to_string())
        })?;

        debug!("Raw model output:\n{}", response.content);

        let flashcards = parse_flashcards(&response.content).inspect_err(|e| {
            warn!("Could not parse model output: {}", e);
        })?;

        info!(
            "Generated {} flashcards for '{}' from {} chunks in {:.2}s",
            flashcards.len(),
            topic,
            sources.len(),
            start.elapsed().as_secs_f64()
        );

        Ok(FlashcardSet {
            topic: topic.to_string(),
            flashcards,
            sources,
            empty_retrieval: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_settings() {
        let llm = LlmSettings {
            model: "gemini-1.5-pro".to_string(),
            temperature: Some(0.2),
            ..LlmSettings::default()
        };
        let generation = GenerationSettings {
            skip_on_empty_context: false,
            ..GenerationSettings::default()
        };

        let options = GenerationOptions::from_settings(&llm, &generation);
        assert_eq!(options.model, "gemini-1.5-pro");
        assert_eq!(options.temperature, Some(0.2));
        assert_eq!(options.max_tokens, None);
        assert!(!options.skip_on_empty_context);
    }
}
