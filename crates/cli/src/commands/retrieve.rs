//! Retrieve command handler.
//!
//! Smoke test for the index: runs retrieval only and previews what each
//! query would send to the model.

use super::{embedder, preview, print_json};
use clap::Args;
use flashcards_core::{config::AppConfig, AppResult};
use flashcards_knowledge::{RetrievalOptions, Retriever};

const PREVIEW_CHARS: usize = 400;

/// Show the chunks retrieved for one or more queries
#[derive(Args, Debug)]
pub struct RetrieveCommand {
    /// Queries to run
    #[arg(required = true)]
    pub queries: Vec<String>,

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

impl RetrieveCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing retrieve command for {} queries", self.queries.len());

        let mut config = config.clone();
        if let Some(top_k) = self.top_k {
            config.knowledge.top_k = top_k;
        }
        if let Some(threshold) = self.threshold {
            config.knowledge.score_threshold = threshold;
        }
        config.validate_knowledge()?;

        let retriever =
            Retriever::open(embedder(&config)?, RetrievalOptions::from_config(&config)).await?;

        let mut results = Vec::with_capacity(self.queries.len());
        for query in &self.queries {
            results.push(retriever.retrieve(query).await?);
        }

        if self.json {
            return print_json(&results);
        }

        for result in &results {
            println!("Query: {}", result.query);
            println!("Found {} chunks", result.len());

            if result.is_empty() {
                println!(
                    "No chunks scored at or above {:.2}. If the documents changed, rebuild the index with `flashcards build`.",
                    result.threshold
                );
            }

            for (i, scored) in result.chunks.iter().enumerate() {
                println!(
                    "[{}] {} (page {}), score {:.3}",
                    i + 1,
                    scored.chunk.source_name(),
                    scored.chunk.display_page(),
                    scored.score
                );
                println!("    {}", preview(&scored.chunk.text, PREVIEW_CHARS));
            }
            println!();
        }

        Ok(())
    }
}
