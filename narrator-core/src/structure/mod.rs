//! Chapter structure detection for flat text.

pub mod detector;
pub mod patterns;

pub use detector::{PREAMBLE_TITLE, StructureDetector};
pub use patterns::{ChapterPatternMatcher, HeadingRule};
