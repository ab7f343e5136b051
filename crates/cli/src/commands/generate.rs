//! Generate command handler.
//!
//! Runs the query-phase pipeline for one topic and renders the cards with
//! their source citations.

use super::{embedder, llm_client, print_json};
use clap::Args;
use flashcards_core::{config::AppConfig, AppError, AppResult};
use flashcards_knowledge::{
    FlashcardGenerator, FlashcardSet, GenerationOptions, RetrievalOptions, Retriever,
};
use flashcards_prompt::load_prompt;
use serde::Serialize;
use std::fmt::Write;
use std::time::Instant;

/// Generate flashcards for a topic from the indexed documents
#[derive(Args, Debug)]
pub struct GenerateCommand {
    /// Topic to generate flashcards for
    #[arg(required = true)]
    pub topic: Vec<String>,

    /// Number of chunks to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Minimum similarity score for retrieved chunks
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateOutput<'a> {
    #[serde(flatten)]
    result: &'a FlashcardSet,
    elapsed_secs: f64,
}

impl GenerateCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let topic = self.topic.join(" ");
        tracing::info!("Executing generate command for topic '{}'", topic);

        let mut config = config.clone();
        if let Some(top_k) = self.top_k {
            config.knowledge.top_k = top_k;
        }
        if let Some(threshold) = self.threshold {
            config.knowledge.score_threshold = threshold;
        }
        config.validate()?;

        let start = Instant::now();

        let retriever =
            Retriever::open(embedder(&config)?, RetrievalOptions::from_config(&config)).await?;
        let prompt = load_prompt(&config.workspace, &config.generation.prompt_id)?;
        let generator = FlashcardGenerator::new(
            retriever,
            llm_client(&config)?,
            prompt,
            GenerationOptions::from_settings(&config.llm, &config.generation),
        );

        let set = match generator.generate(&topic).await {
            Ok(set) => set,
            Err(e @ AppError::Generation(_)) => {
                eprintln!(
                    "Failed to generate flashcards for \"{}\". Please try again.",
                    topic
                );
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        let elapsed = start.elapsed().as_secs_f64();

        if self.json {
            return print_json(&GenerateOutput {
                result: &set,
                elapsed_secs: elapsed,
            });
        }

        print!("{}", render(&set));
        println!();
        println!("Generated in {:.2}s", elapsed);
        Ok(())
    }
}

fn render(set: &FlashcardSet) -> String {
    let mut out = String::new();

    if set.flashcards.is_empty() {
        if set.sources.is_empty() {
            let _ = writeln!(
                out,
                "No material about \"{}\" was found in the indexed documents.",
                set.topic
            );
            return out;
        }
        let _ = writeln!(
            out,
            "The retrieved material did not yield any flashcards about \"{}\".",
            set.topic
        );
    } else {
        let _ = writeln!(out, "Flashcards: {}\n", set.topic);
        for (i, card) in set.flashcards.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, card.term);
            let _ = writeln!(out, "   {}\n", card.definition);
        }
    }

    if set.sources.is_empty() {
        let _ = writeln!(out, "Sources: none, no indexed material matched the topic.");
        return out;
    }

    let _ = writeln!(out, "Sources:");
    for scored in &set.sources.chunks {
        let _ = writeln!(
            out,
            "- {} (page {})",
            scored.chunk.source_name(),
            scored.chunk.display_page()
        );
        let _ = writeln!(out, "  {}", scored.chunk.text);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashcards_knowledge::{DocumentChunk, Flashcard, RetrievalResult, ScoredChunk};

    fn set(cards: &[(&str, &str)], sources: &[&str], empty_retrieval: bool) -> FlashcardSet {
        FlashcardSet {
            topic: "Fotosintesis".to_string(),
            flashcards: cards
                .iter()
                .map(|(term, definition)| Flashcard {
                    term: term.to_string(),
                    definition: definition.to_string(),
                })
                .collect(),
            sources: RetrievalResult {
                query: "Fotosintesis".to_string(),
                threshold: 0.7,
                chunks: sources
                    .iter()
                    .enumerate()
                    .map(|(i, text)| ScoredChunk {
                        chunk: DocumentChunk {
                            id: format!("chunk-{i}"),
                            source: "documents/biologi.pdf".to_string(),
                            page: i as u32,
                            position: 0,
                            text: text.to_string(),
                            embedding: None,
                        },
                        score: 0.9,
                    })
                    .collect(),
            },
            empty_retrieval,
        }
    }

    #[test]
    fn test_render_cards_with_sources() {
        let out = render(&set(
            &[("Klorofil", "Pigmen hijau penyerap cahaya.")],
            &["Klorofil menyerap cahaya."],
            false,
        ));

        assert!(out.contains("1. Klorofil\n   Pigmen hijau penyerap cahaya."));
        assert!(out.contains("- biologi.pdf (page 1)"));
    }

    #[test]
    fn test_render_skipped_model() {
        let out = render(&set(&[], &[], true));
        assert!(out.starts_with("No material about \"Fotosintesis\""));
    }

    #[test]
    fn test_render_cards_without_sources() {
        let out = render(&set(&[("Klorofil", "Pigmen hijau penyerap cahaya.")], &[], false));

        assert!(out.contains("1. Klorofil"));
        assert!(!out.contains("No material"));
        assert!(out.contains("Sources: none"));
    }
}
