//! Chapter heading classification as an ordered list of independent rules.

use crate::error::{NarratorError, Result};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

static CHAPTER_NUMBERED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^chapter\s+[\dIVX]+").expect("valid chapter regex"));

static CHAPTER_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^chapter\s+\w+$").expect("valid chapter word regex"));

static NUMBERED_SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\s+\w+").expect("valid numbered section regex"));

static ROMAN_SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[IVX]+\.\s+\w+").expect("valid roman section regex"));

/// Longest line (exclusive) still considered an all-caps heading.
const MAX_CAPS_HEADING_LEN: usize = 50;
/// Shortest line (exclusive) considered an all-caps heading.
const MIN_CAPS_HEADING_LEN: usize = 3;

/// One stateless heading rule.
#[derive(Debug, Clone)]
pub enum HeadingRule {
    /// A regex matched against the start of the line.
    Pattern { name: String, regex: Regex },
    /// An arbitrary predicate over the line.
    Predicate { name: String, check: fn(&str) -> bool },
}

impl HeadingRule {
    /// Rule name, used in logs and tests.
    pub fn name(&self) -> &str {
        match self {
            HeadingRule::Pattern { name, .. } | HeadingRule::Predicate { name, .. } => name,
        }
    }

    /// Whether this rule classifies the line as a heading.
    pub fn matches(&self, line: &str) -> bool {
        match self {
            HeadingRule::Pattern { regex, .. } => regex.is_match(line),
            HeadingRule::Predicate { check, .. } => check(line),
        }
    }
}

/// Heuristic: the whole line is upper-case and of heading length.
pub fn is_all_caps_heading(line: &str) -> bool {
    let len = line.chars().count();
    if len <= MIN_CAPS_HEADING_LEN || len >= MAX_CAPS_HEADING_LEN {
        return false;
    }
    line.chars().any(char::is_uppercase) && !line.chars().any(char::is_lowercase)
}

/// Classifies single lines as chapter headings. First matching rule wins.
#[derive(Debug, Clone)]
pub struct ChapterPatternMatcher {
    rules: Vec<HeadingRule>,
}

impl Default for ChapterPatternMatcher {
    fn default() -> Self {
        let pattern = |name: &str, regex: &Lazy<Regex>| HeadingRule::Pattern {
            name: name.to_string(),
            regex: Regex::clone(regex),
        };

        Self {
            rules: vec![
                pattern("chapter-number", &CHAPTER_NUMBERED),
                pattern("chapter-word", &CHAPTER_WORD),
                pattern("numbered-section", &NUMBERED_SECTION),
                pattern("roman-section", &ROMAN_SECTION),
                HeadingRule::Predicate {
                    name: "all-caps".to_string(),
                    check: is_all_caps_heading,
                },
            ],
        }
    }
}

impl ChapterPatternMatcher {
    /// Matcher with the built-in rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in rules followed by extra case-insensitive patterns.
    pub fn with_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut matcher = Self::default();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    NarratorError::Validation(format!("invalid chapter pattern '{}': {}", pattern, e))
                })?;
            matcher = matcher.with_rule(HeadingRule::Pattern {
                name: format!("custom:{}", pattern),
                regex,
            });
        }
        Ok(matcher)
    }

    /// Append a rule after the existing ones.
    pub fn with_rule(mut self, rule: HeadingRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// The rules in evaluation order.
    pub fn rules(&self) -> &[HeadingRule] {
        &self.rules
    }

    /// Name of the first rule matching an already-trimmed line.
    pub fn matched_rule(&self, line: &str) -> Option<&str> {
        if line.is_empty() {
            return None;
        }
        self.rules
            .iter()
            .find(|rule| rule.matches(line))
            .map(HeadingRule::name)
    }

    /// Whether an already-trimmed line is a chapter heading.
    pub fn is_heading(&self, line: &str) -> bool {
        self.matched_rule(line).is_some()
    }
}
