//! Document and chapter types handed to the pipeline by a parsing layer.

use crate::error::{NarratorError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// A titled, numbered segment of a document's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// Display title
    pub title: String,
    /// Plain text content (may be empty, in which case it is never synthesized)
    pub content: String,
    /// 1-based position within the document
    pub number: usize,
}

impl Chapter {
    /// Create a new chapter.
    pub fn new(title: impl Into<String>, content: impl Into<String>, number: usize) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            number,
        }
    }

    /// Whether the chapter has anything worth speaking.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Character count of the content.
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// A parsed document: title, optional author, full text and detected chapters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    /// Full text of the document
    pub content: String,
    /// Chapters in reading order (empty when no structure was found)
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    /// Create a document without chapters.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// Attach chapters.
    pub fn with_chapters(mut self, chapters: Vec<Chapter>) -> Self {
        self.chapters = chapters;
        self
    }

    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Check the chapter invariants: numbers are exactly 1..N in order and
    /// every chapter has a title.
    pub fn validate(&self) -> Result<()> {
        for (index, chapter) in self.chapters.iter().enumerate() {
            let expected = index + 1;
            if chapter.number != expected {
                return Err(NarratorError::Validation(format!(
                    "chapter at position {} is numbered {} (expected {})",
                    expected, chapter.number, expected
                )));
            }
            if chapter.title.trim().is_empty() {
                return Err(NarratorError::Validation(format!(
                    "chapter {} has an empty title",
                    chapter.number
                )));
            }
        }
        Ok(())
    }

    /// The units of audio output for this document.
    ///
    /// Without chapters the whole content becomes chapter 1, titled with the
    /// document title. A document with neither chapters nor content is rejected.
    pub fn work_units(&self) -> Result<Cow<'_, [Chapter]>> {
        if !self.chapters.is_empty() {
            return Ok(Cow::Borrowed(&self.chapters));
        }

        if self.content.trim().is_empty() {
            return Err(NarratorError::Validation(format!(
                "document '{}' has no chapters and no content",
                self.title
            )));
        }

        Ok(Cow::Owned(vec![Chapter::new(
            self.title.clone(),
            self.content.clone(),
            1,
        )]))
    }

    /// Total words across the document content.
    pub fn total_words(&self) -> usize {
        self.content.split_whitespace().count()
    }
}
