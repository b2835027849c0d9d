//! Speech engine trait, voice settings, and the synthesis stage.

pub mod command;
pub mod synthesis;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

pub use command::{CommandSpeechEngine, EngineKind};
pub use synthesis::{Fragment, SynthesisPolicy, SynthesisResult, synthesize};

/// Words per minute at speed 1.0.
pub const BASE_WPM: f32 = 180.0;

const MIN_SPEED: f32 = 0.5;
const MAX_SPEED: f32 = 2.0;

/// Map a speed multiplier to the engine's words-per-minute rate.
pub fn words_per_minute(speed: f32) -> u32 {
    (BASE_WPM * speed).round().max(1.0) as u32
}

/// Voice and rate used for every synthesis call of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    /// Engine voice identifier; `None` uses the engine's default voice
    pub voice: Option<String>,
    /// Speed multiplier (0.5-2.0, default 1.0)
    pub speed: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            voice: None,
            speed: 1.0,
        }
    }
}

impl VoiceSettings {
    /// Create voice settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the voice.
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    /// Set the speed multiplier.
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        self
    }

    /// Rate in words per minute.
    pub fn words_per_minute(&self) -> u32 {
        words_per_minute(self.speed)
    }
}

/// A text-to-speech engine.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Speak `text` into an audio file at `output_path`.
    ///
    /// Timeouts are applied by the caller; dropping the future must stop the
    /// engine.
    async fn speak(&self, text: &str, settings: &VoiceSettings, output_path: &Path) -> Result<()>;

    /// File extension of the fragments this engine writes.
    fn fragment_extension(&self) -> &str;

    /// Engine name for display.
    fn name(&self) -> &str;
}
