//! Text cleaning and normalization before synthesis.

use once_cell::sync::Lazy;
use regex::Regex;

/// Characters that trip up TTS engines and their replacements.
const PROBLEMATIC_CHARS: &[(char, &str)] = &[
    ('\u{2018}', "'"),   // Left single quote
    ('\u{2019}', "'"),   // Right single quote
    ('\u{201c}', "\""),  // Left double quote
    ('\u{201d}', "\""),  // Right double quote
    ('\u{2013}', "-"),   // En dash
    ('\u{2014}', "-"),   // Em dash
    ('\u{2026}', "..."), // Ellipsis
    ('\u{00a0}', " "),   // Non-breaking space
    ('\u{200b}', ""),    // Zero-width space
    ('\u{200c}', ""),    // Zero-width non-joiner
    ('\u{200d}', ""),    // Zero-width joiner
    ('\u{feff}', ""),    // BOM
    ('\u{2011}', "-"),   // Non-breaking hyphen
    ('\u{00ab}', "\""),  // Left-pointing double angle quote
    ('\u{00bb}', "\""),  // Right-pointing double angle quote
];

/// A word hyphenated across a line break, continued in lower case.
static LINE_BREAK_HYPHEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)-\n([a-z])").expect("valid hyphenation regex"));

/// "12", "Page 3", "- 4 -", "5 of 20"
static PAGE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^-?\s*(?:page\s+)?\d+(?:\s+of\s+\d+)?\s*-?$").expect("valid page number regex")
});

/// Which cleaning passes to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanOptions {
    /// Drop lines that only hold a page number
    pub remove_page_numbers: bool,
    /// Rejoin words split with a hyphen at a line break
    pub fix_hyphenation: bool,
    /// Join hard-wrapped lines into paragraphs
    pub reflow: bool,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            remove_page_numbers: true,
            fix_hyphenation: true,
            reflow: true,
        }
    }
}

/// Clean text for TTS processing with every pass enabled.
pub fn clean_text(text: &str) -> String {
    clean_text_with(text, CleanOptions::default())
}

/// Clean text for TTS processing.
///
/// Normalizes line endings, replaces typographic characters, strips control
/// characters, then applies the passes selected in `options`. Paragraphs end
/// up separated by exactly one blank line.
pub fn clean_text_with(text: &str, options: CleanOptions) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = replace_characters(&text);

    let text = if options.fix_hyphenation {
        LINE_BREAK_HYPHEN.replace_all(&text, "$1$2").into_owned()
    } else {
        text
    };

    let lines: Vec<&str> = text
        .split('\n')
        .filter(|line| !(options.remove_page_numbers && PAGE_NUMBER.is_match(line.trim())))
        .collect();

    let text = if options.reflow {
        reflow(&lines)
    } else {
        lines.join("\n")
    };

    let text = collapse_spaces(&text);
    fix_multiple_periods(text.trim())
}

fn replace_characters(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for c in text.chars() {
        if let Some((_, replacement)) = PROBLEMATIC_CHARS.iter().find(|(ch, _)| *ch == c) {
            result.push_str(replacement);
        } else if c == '\n' || c == '\t' || !c.is_control() {
            result.push(c);
        }
    }

    result
}

/// Join consecutive non-blank lines; blank lines end a paragraph.
fn reflow(lines: &[&str]) -> String {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in lines {
        let stripped = line.trim();
        if stripped.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(stripped);
        }
    }

    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    paragraphs.join("\n\n")
}

/// Collapse runs of spaces and tabs into a single space.
fn collapse_spaces(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_was_space = false;

    for c in text.chars() {
        if c == ' ' || c == '\t' {
            if !prev_was_space {
                result.push(' ');
            }
            prev_was_space = true;
        } else {
            prev_was_space = false;
            result.push(c);
        }
    }

    result
}

/// Replace runs of periods with one; "..." makes some engines emit noise.
fn fix_multiple_periods(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_was_period = false;

    for c in text.chars() {
        if c == '.' {
            if !prev_was_period {
                result.push('.');
            }
            prev_was_period = true;
        } else {
            prev_was_period = false;
            result.push(c);
        }
    }

    result
}
