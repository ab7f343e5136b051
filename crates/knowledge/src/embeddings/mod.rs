//! Embedding boundary for ingestion and retrieval.
//!
//! Text goes in, fixed-dimension vectors come out. The same provider, model
//! and dimension must be used to build and to query an index.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::{EmbeddingConfig, EmbeddingIdentity};
pub use provider::{create_provider, EmbeddingProvider};
