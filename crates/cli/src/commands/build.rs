//! Build command handler.
//!
//! Ingests the documents directory and replaces the similarity index.

use super::{embedder, print_json};
use clap::Args;
use flashcards_core::{config::AppConfig, AppResult};
use flashcards_knowledge::{BuildOptions, IndexBuilder, ProgressReporter};
use std::path::PathBuf;
use std::sync::Arc;

/// Build the similarity index from the documents directory
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Directory with PDF, text and Markdown documents
    #[arg(short, long)]
    pub documents: Option<PathBuf>,

    /// Where to write the index
    #[arg(short, long)]
    pub index: Option<PathBuf>,

    /// Chunks per embedding request
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Pause between embedding requests, in milliseconds
    #[arg(long)]
    pub batch_delay_ms: Option<u64>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl BuildCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing build command");

        let mut config = config.clone();
        if let Some(documents) = &self.documents {
            config.knowledge.documents_dir = documents.clone();
        }
        if let Some(index) = &self.index {
            config.knowledge.index_dir = index.clone();
        }
        if let Some(batch_size) = self.batch_size {
            config.knowledge.batch_size = batch_size;
        }
        if let Some(delay) = self.batch_delay_ms {
            config.knowledge.batch_delay_ms = delay;
        }
        config.validate_knowledge()?;

        let progress = if self.json {
            ProgressReporter::noop()
        } else {
            ProgressReporter::new(Arc::new(|event| eprintln!("{}", event.format_simple())))
        };

        let stats = IndexBuilder::new(embedder(&config)?, BuildOptions::from_config(&config))
            .with_progress(progress)
            .build()
            .await?;

        if self.json {
            print_json(&stats)?;
        } else {
            println!(
                "Indexed {} chunks from {} documents ({} pages) in {} batches, {:.2}s",
                stats.chunks, stats.documents, stats.pages, stats.batches, stats.duration_secs
            );
            println!("Index: {}", stats.index_dir.display());
        }

        Ok(())
    }
}
