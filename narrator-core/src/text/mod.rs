//! Text processing for TTS: cleaning and chunking.

pub mod chunker;
pub mod cleaner;

pub use chunker::{DEFAULT_MAX_CHARS, chunk_chapter, chunk_text};
pub use cleaner::clean_text;

/// A bounded piece of chapter text, the unit of one synthesis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position within the chapter
    pub ordinal: usize,
    /// The text content
    pub text: String,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(ordinal: usize, text: impl Into<String>) -> Self {
        Self {
            ordinal,
            text: text.into(),
        }
    }

    /// Length in characters.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}
