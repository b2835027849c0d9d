//! Loading a plain-text file into a `Document`.

use anyhow::{Context, Result};
use log::{info, warn};
use narrator_core::{Chapter, ChapterPatternMatcher, Document, StructureDetector, clean_text};
use std::path::Path;

/// How the input text is turned into chapters.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub detect_chapters: bool,
    pub clean_text: bool,
    /// Extra heading patterns appended to the built-in rules
    pub chapter_patterns: Vec<String>,
}

/// Read a text file, detect its chapters and clean their text.
pub fn load_document(path: &Path, options: &LoadOptions) -> Result<Document> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!("{} is not valid UTF-8, replacing invalid bytes", path.display());
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };
    let text = text.replace("\r\n", "\n");

    let title = title_from_path(path);
    let chapters = if options.detect_chapters {
        let matcher = ChapterPatternMatcher::with_patterns(&options.chapter_patterns)
            .context("Invalid chapter pattern in configuration")?;
        StructureDetector::with_matcher(matcher).split_into_chapters(&text)
    } else {
        Vec::new()
    };

    if options.detect_chapters {
        if chapters.is_empty() {
            info!("No chapter headings found, treating the whole text as one chapter");
        } else {
            info!("Detected {} chapter(s)", chapters.len());
        }
    }

    build_document(title, text, chapters, options.clean_text)
}

/// Assemble the document, cleaning chapter text after detection.
fn build_document(title: String, text: String, chapters: Vec<Chapter>, clean: bool) -> Result<Document> {
    let (content, chapters) = if clean {
        let chapters = chapters
            .into_iter()
            .map(|chapter| Chapter {
                content: clean_text(&chapter.content),
                ..chapter
            })
            .collect();
        (clean_text(&text), chapters)
    } else {
        (text, chapters)
    };

    let document = Document::new(title, content).with_chapters(chapters);
    document.validate()?;
    Ok(document)
}

/// Title from the file stem: underscores become spaces, words are capitalised.
pub fn title_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let title = title_case(&stem.replace('_', " "));
    if title.is_empty() {
        "Untitled".to_string()
    } else {
        title
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
