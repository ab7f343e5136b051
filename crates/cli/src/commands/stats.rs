//! Stats command handler.
//!
//! Shows what the persisted index was built from.

use super::print_json;
use clap::Args;
use flashcards_core::{config::AppConfig, AppResult};
use flashcards_knowledge::index_stats;
use std::path::PathBuf;

/// Show index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Index directory (defaults to the configured one)
    #[arg(short, long)]
    pub index: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let index_dir = self.index.clone().unwrap_or_else(|| config.index_dir());
        let stats = index_stats(&index_dir)?;

        if self.json {
            return print_json(&stats);
        }

        let m = &stats.manifest;
        println!("Index: {}", index_dir.display());
        println!(
            "Embedding: {} / {} ({} dimensions)",
            m.embedding.provider, m.embedding.model, m.embedding.dimensions
        );
        println!("Chunking: size {}, overlap {}", m.chunk_size, m.chunk_overlap);
        println!(
            "Contents: {} documents, {} pages, {} chunks",
            m.documents, m.pages, m.chunks
        );
        println!("Built at: {}", m.built_at.to_rfc3339());
        println!("Size on disk: {}", format_bytes(stats.size_bytes));

        Ok(())
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
