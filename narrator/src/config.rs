//! narrate configuration file.

use anyhow::{Context, Result};
use narrator_core::{EngineKind, SynthesisPolicy, TargetFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where final files go (default: ./audiobook_output)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Parent directory for the temporary workspace
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub processing: ProcessingConfig,

    #[serde(default)]
    pub performance: PerformanceConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default)]
    pub engine: EngineKind,

    /// Engine voice; none means the engine default
    #[serde(default)]
    pub voice: Option<String>,

    /// Speed multiplier (0.5-2.0)
    #[serde(default = "default_speed")]
    pub speed: f32,

    #[serde(default)]
    pub format: TargetFormat,

    /// Bitrate in kbps (64-320); none means the format default
    #[serde(default)]
    pub bitrate_kbps: Option<u32>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            voice: None,
            speed: default_speed(),
            format: TargetFormat::default(),
            bitrate_kbps: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    #[serde(default = "default_true")]
    pub detect_chapters: bool,

    #[serde(default = "default_true")]
    pub clean_text: bool,

    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Extra heading regexes, tried after the built-in rules
    #[serde(default)]
    pub chapter_patterns: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            detect_chapters: true,
            clean_text: true,
            max_chunk_chars: default_max_chunk_chars(),
            chapter_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceConfig {
    #[serde(default = "default_workers")]
    pub chapter_workers: usize,

    #[serde(default = "default_workers")]
    pub chunk_workers: usize,

    /// Engine processes running at once across all chapters
    #[serde(default = "default_synthesis_workers")]
    pub synthesis_workers: usize,

    /// Per-call speech engine timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Attempts per chunk when the engine times out
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Timeout for sox and ffmpeg
    #[serde(default = "default_tool_timeout_seconds")]
    pub tool_timeout_seconds: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            chapter_workers: default_workers(),
            chunk_workers: default_workers(),
            synthesis_workers: default_synthesis_workers(),
            timeout_seconds: default_timeout_seconds(),
            max_retries: default_max_retries(),
            tool_timeout_seconds: default_tool_timeout_seconds(),
        }
    }
}

impl PerformanceConfig {
    pub fn synthesis_policy(&self) -> SynthesisPolicy {
        SynthesisPolicy {
            timeout: Duration::from_secs(self.timeout_seconds),
            max_attempts: self.max_retries,
        }
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_seconds)
    }
}

/// Explicit program paths; unset ones are looked up on PATH.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub say: Option<PathBuf>,
    #[serde(default)]
    pub espeak: Option<PathBuf>,
    #[serde(default)]
    pub sox: Option<PathBuf>,
    #[serde(default)]
    pub ffmpeg: Option<PathBuf>,
}

impl ToolsConfig {
    /// Configured path for the given engine, if any.
    pub fn engine_program(&self, engine: EngineKind) -> Option<PathBuf> {
        match engine {
            EngineKind::Say => self.say.clone(),
            EngineKind::Espeak => self.espeak.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_speed() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_max_chunk_chars() -> usize {
    narrator_core::text::DEFAULT_MAX_CHARS
}

fn default_workers() -> usize {
    1
}

fn default_synthesis_workers() -> usize {
    4
}

fn default_timeout_seconds() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    3
}

fn default_tool_timeout_seconds() -> u64 {
    600
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Get the default config file path: <config_dir>/narrator/config.toml
    pub fn config_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(dir.join("narrator").join("config.toml"))
    }

    /// Load config from `path` (or the default path), returning defaults if missing.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config.normalized())
    }

    /// Save config to `path` (or the default path).
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Clamp every value into its supported range.
    pub fn normalized(mut self) -> Self {
        self.audio.speed = self.audio.speed.clamp(0.5, 2.0);
        self.audio.bitrate_kbps = self.audio.bitrate_kbps.map(|b| b.clamp(64, 320));
        self.processing.max_chunk_chars = self.processing.max_chunk_chars.clamp(50, 10_000);
        self.performance.chapter_workers = self.performance.chapter_workers.clamp(1, 16);
        self.performance.chunk_workers = self.performance.chunk_workers.clamp(1, 16);
        self.performance.synthesis_workers = self.performance.synthesis_workers.clamp(1, 16);
        self.performance.timeout_seconds = self.performance.timeout_seconds.clamp(30, 3600);
        self.performance.max_retries = self.performance.max_retries.clamp(1, 10);
        self.performance.tool_timeout_seconds = self.performance.tool_timeout_seconds.max(1);
        self
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("audiobook_output"))
    }
}
