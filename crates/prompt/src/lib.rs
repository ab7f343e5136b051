//! Prompt system for the flashcards pipeline.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions
//! - Handlebars template rendering
//! - A built-in few-shot flashcard prompt, overridable per workspace

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{builtin_prompt, load_prompt, BUILTIN_PROMPT_ID};
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, OutputFormat, PromptBehavior, PromptDefinition,
    PromptInputSpec, PromptOutputSpec,
};
