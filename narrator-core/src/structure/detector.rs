//! Splits flat text into chapters at heading lines.

use super::patterns::ChapterPatternMatcher;
use crate::document::Chapter;
use log::debug;

/// Title given to text that precedes the first heading.
pub const PREAMBLE_TITLE: &str = "Introduction";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// No heading seen yet
    CollectingPreamble,
    /// At least one heading seen
    InChapter,
}

/// Detects chapter boundaries in unstructured text.
#[derive(Debug, Clone, Default)]
pub struct StructureDetector {
    matcher: ChapterPatternMatcher,
}

impl StructureDetector {
    /// Detector using the built-in heading rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Detector using a custom matcher.
    pub fn with_matcher(matcher: ChapterPatternMatcher) -> Self {
        Self { matcher }
    }

    /// Split text into chapters.
    ///
    /// Returns an empty list when no line looks like a heading, leaving the
    /// fallback to the caller. Chapters with blank content are never emitted,
    /// and numbers run 1..N in emission order regardless of heading text.
    pub fn split_into_chapters(&self, text: &str) -> Vec<Chapter> {
        let mut chapters = Vec::new();
        let mut state = ScanState::CollectingPreamble;
        let mut current_title = PREAMBLE_TITLE.to_string();
        let mut current_lines: Vec<&str> = Vec::new();

        for line in text.lines() {
            let trimmed = line.trim();

            if self.matcher.is_heading(trimmed) {
                flush_chapter(&mut chapters, &current_title, &current_lines);
                current_title = trimmed.to_string();
                current_lines.clear();
                state = ScanState::InChapter;
            } else {
                current_lines.push(line);
            }
        }

        if state == ScanState::CollectingPreamble {
            debug!("No chapter headings found");
            return Vec::new();
        }

        flush_chapter(&mut chapters, &current_title, &current_lines);
        debug!("Detected {} chapter(s)", chapters.len());
        chapters
    }
}

fn flush_chapter(chapters: &mut Vec<Chapter>, title: &str, lines: &[&str]) {
    let content = lines.join("\n");
    let content = content.trim();
    if content.is_empty() {
        return;
    }
    let number = chapters.len() + 1;
    chapters.push(Chapter::new(title, content, number));
}
