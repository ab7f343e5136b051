//! Retrieval-augmented flashcard generation.

pub mod generate;
pub mod parse;
pub mod types;

pub use generate::{FlashcardGenerator, GenerationOptions};
pub use parse::parse_flashcards;
pub use types::{Flashcard, FlashcardSet};
