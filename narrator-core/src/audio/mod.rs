//! Audio combination and conversion stages.

pub mod combiner;
pub mod converter;

pub use combiner::{Concatenator, SoxConcatenator, combine};
pub use converter::{
    FfmpegTranscoder, TargetFormat, TranscodeInput, TranscodeRequest, Transcoder, convert_to_final,
    write_manifest,
};
