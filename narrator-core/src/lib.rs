//! Turn long-form text into one audio file per chapter.
//!
//! Chapters are found heuristically in flat text, split into bounded chunks,
//! spoken by an external speech engine, concatenated into a master track and
//! transcoded into the final format.

pub mod audio;
pub mod document;
pub mod error;
pub mod pipeline;
pub mod structure;
pub mod text;
pub mod tool;
pub mod tts;

#[cfg(test)]
pub(crate) mod testing;

pub use audio::{Concatenator, FfmpegTranscoder, SoxConcatenator, TargetFormat, Transcoder};
pub use document::{Chapter, Document};
pub use error::{NarratorError, Result};
pub use pipeline::{FailureKind, Pipeline, PipelineEvent, PipelineOptions, PipelineOutcome};
pub use structure::{ChapterPatternMatcher, StructureDetector};
pub use text::{Chunk, chunk_text, clean_text};
pub use tts::{CommandSpeechEngine, EngineKind, SpeechEngine, SynthesisPolicy, VoiceSettings};
