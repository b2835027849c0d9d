//! Speech engines driven as command-line programs (`say`, `espeak-ng`).

use super::{SpeechEngine, VoiceSettings};
use crate::error::{NarratorError, Result};
use crate::tool::run_tool;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::process::Command;

/// Supported command-line speech engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// macOS `say`, writes AIFF
    #[default]
    Say,
    /// `espeak-ng`, writes WAV
    Espeak,
}

impl EngineKind {
    /// Program looked up on PATH when no explicit path is configured.
    pub fn default_program(&self) -> &'static str {
        match self {
            EngineKind::Say => "say",
            EngineKind::Espeak => "espeak-ng",
        }
    }

    /// Extension of the audio files the engine writes.
    pub fn extension(&self) -> &'static str {
        match self {
            EngineKind::Say => "aiff",
            EngineKind::Espeak => "wav",
        }
    }
}

impl FromStr for EngineKind {
    type Err = NarratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "say" => Ok(Self::Say),
            "espeak" | "espeak-ng" => Ok(Self::Espeak),
            _ => Err(NarratorError::Validation(format!("Unknown speech engine: {}", s))),
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::Say => write!(f, "say"),
            EngineKind::Espeak => write!(f, "espeak"),
        }
    }
}

/// A speech engine invoked once per chunk as a child process.
#[derive(Debug, Clone)]
pub struct CommandSpeechEngine {
    kind: EngineKind,
    program: PathBuf,
}

impl CommandSpeechEngine {
    /// Create an engine, using `program` instead of the default binary if given.
    pub fn new(kind: EngineKind, program: Option<PathBuf>) -> Self {
        let program = program.unwrap_or_else(|| PathBuf::from(kind.default_program()));
        Self { kind, program }
    }

    /// The engine flavour.
    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    /// Build the argument list for one call.
    pub fn build_args(&self, text: &str, settings: &VoiceSettings, output_path: &Path) -> Vec<OsString> {
        let (rate_flag, output_flag) = match self.kind {
            EngineKind::Say => ("-r", "-o"),
            EngineKind::Espeak => ("-s", "-w"),
        };

        let mut args: Vec<OsString> = Vec::new();
        if let Some(voice) = &settings.voice {
            args.push("-v".into());
            args.push(voice.into());
        }
        args.push(rate_flag.into());
        args.push(settings.words_per_minute().to_string().into());
        args.push(output_flag.into());
        args.push(output_path.as_os_str().to_owned());
        // End of options, so text starting with '-' is spoken rather than parsed
        args.push("--".into());
        args.push(text.into());
        args
    }
}

#[async_trait]
impl SpeechEngine for CommandSpeechEngine {
    async fn speak(&self, text: &str, settings: &VoiceSettings, output_path: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.build_args(text, settings, output_path));
        run_tool(cmd, self.kind.default_program(), None).await
    }

    fn fragment_extension(&self) -> &str {
        self.kind.extension()
    }

    fn name(&self) -> &str {
        self.kind.default_program()
    }
}
