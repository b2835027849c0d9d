//! Text chunking for TTS processing.

use super::Chunk;
use once_cell::sync::Lazy;
use regex::Regex;

/// Default maximum chunk size in characters.
pub const DEFAULT_MAX_CHARS: usize = 1000;

/// Delimiter used to split over-long paragraphs into sentences.
const SENTENCE_DELIMITER: &str = ". ";

/// A blank line (possibly holding whitespace) separates paragraphs.
static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid paragraph regex"));

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split text into chunks of at most `max_chars` characters.
///
/// Paragraphs that fit are kept whole. Longer paragraphs are split into
/// sentences which are greedily packed, joined by a single space. A sentence
/// longer than `max_chars` is emitted on its own rather than cut.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();

    for paragraph in PARAGRAPH_BREAK.split(text) {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        if char_len(paragraph) <= max_chars {
            chunks.push(paragraph.to_string());
        } else {
            pack_sentences(&split_sentences(paragraph), max_chars, &mut chunks);
        }
    }

    chunks
}

/// Split a paragraph on ". ", restoring the period on every piece but the last.
fn split_sentences(paragraph: &str) -> Vec<String> {
    let pieces: Vec<&str> = paragraph.split(SENTENCE_DELIMITER).collect();
    let last = pieces.len().saturating_sub(1);
    let mut sentences: Vec<String> = Vec::with_capacity(pieces.len());

    for (i, piece) in pieces.iter().enumerate() {
        let mut sentence = piece.trim().to_string();
        if i < last {
            sentence.push('.');
        }

        if sentence.is_empty() {
            continue;
        }

        // A stray ". " with nothing before it belongs to the previous sentence
        if sentence == "." {
            if let Some(previous) = sentences.last_mut() {
                previous.push('.');
                continue;
            }
        }

        sentences.push(sentence);
    }

    sentences
}

/// Greedily pack sentences into chunks.
fn pack_sentences(sentences: &[String], max_chars: usize, chunks: &mut Vec<String>) {
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in sentences {
        let len = char_len(sentence);

        if current.is_empty() {
            current.push_str(sentence);
            current_len = len;
        } else if current_len + 1 + len <= max_chars {
            current.push(' ');
            current.push_str(sentence);
            current_len += 1 + len;
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push_str(sentence);
            current_len = len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
}

/// Split a chapter's text into ordered chunks.
pub fn chunk_chapter(text: &str, max_chars: usize) -> Vec<Chunk> {
    chunk_text(text, max_chars)
        .into_iter()
        .enumerate()
        .map(|(ordinal, text)| Chunk::new(ordinal, text))
        .collect()
}
