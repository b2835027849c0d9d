//! Transcoding master tracks into the user-facing format.

use crate::error::{NarratorError, Result};
use crate::tool::{PartialFile, run_tool};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::Command;

/// Output formats for final files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    #[default]
    Mp3,
    /// AAC audiobook container, built from an ordered manifest
    M4b,
    Aiff,
}

impl TargetFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Mp3 => "mp3",
            TargetFormat::M4b => "m4b",
            TargetFormat::Aiff => "aiff",
        }
    }

    pub fn codec(&self) -> &'static str {
        match self {
            TargetFormat::Mp3 => "libmp3lame",
            TargetFormat::M4b => "aac",
            TargetFormat::Aiff => "pcm_s16be",
        }
    }

    /// Bitrate used when none is configured; `None` for uncompressed output.
    pub fn default_bitrate_kbps(&self) -> Option<u32> {
        match self {
            TargetFormat::Mp3 => Some(192),
            TargetFormat::M4b => Some(128),
            TargetFormat::Aiff => None,
        }
    }

    /// Whether inputs are passed to the transcoder through a manifest.
    pub fn uses_manifest(&self) -> bool {
        matches!(self, TargetFormat::M4b)
    }
}

impl FromStr for TargetFormat {
    type Err = NarratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            "m4b" => Ok(Self::M4b),
            "aiff" | "aif" => Ok(Self::Aiff),
            _ => Err(NarratorError::Validation(format!("Unknown output format: {}", s))),
        }
    }
}

impl std::fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Where the transcoder reads its audio from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeInput<'a> {
    Single(&'a Path),
    /// A concat manifest listing inputs in order
    Manifest(&'a Path),
}

/// One transcoder invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeRequest<'a> {
    pub input: TranscodeInput<'a>,
    pub codec: &'a str,
    pub bitrate_kbps: Option<u32>,
    pub output: &'a Path,
}

/// An external tool that re-encodes audio.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, request: &TranscodeRequest<'_>) -> Result<()>;
}

/// Transcoding with `ffmpeg`.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl FfmpegTranscoder {
    pub fn new(program: Option<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.unwrap_or_else(|| PathBuf::from("ffmpeg")),
            timeout,
        }
    }

    pub fn build_args(request: &TranscodeRequest<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-y".into()];
        let codec_flag = match request.input {
            TranscodeInput::Single(path) => {
                args.push("-i".into());
                args.push(path.as_os_str().to_owned());
                "-codec:a"
            }
            TranscodeInput::Manifest(path) => {
                args.extend(["-f", "concat", "-safe", "0", "-i"].map(OsString::from));
                args.push(path.as_os_str().to_owned());
                "-c:a"
            }
        };
        args.push(codec_flag.into());
        args.push(request.codec.into());
        if let Some(kbps) = request.bitrate_kbps {
            args.push("-b:a".into());
            args.push(format!("{}k", kbps).into());
        }
        args.push(request.output.as_os_str().to_owned());
        args
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, request: &TranscodeRequest<'_>) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(Self::build_args(request));
        run_tool(cmd, "ffmpeg", self.timeout).await
    }
}

/// Write a concat manifest for `inputs` into `dir`.
///
/// The file is removed when the returned handle is dropped.
pub fn write_manifest(inputs: &[PathBuf], dir: &Path) -> Result<NamedTempFile> {
    let mut manifest = tempfile::Builder::new()
        .prefix("manifest_")
        .suffix(".txt")
        .tempfile_in(dir)?;

    for input in inputs {
        let absolute = std::path::absolute(input)?;
        // Escape single quotes in path
        let path_str = absolute.to_string_lossy().replace('\'', "'\\''");
        writeln!(manifest, "file '{}'", path_str)?;
    }
    manifest.flush()?;

    Ok(manifest)
}

/// Sibling of `output` the transcoder writes to before the final rename.
///
/// Keeps the extension so the transcoder still picks the right container.
fn staging_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match output.extension() {
        Some(ext) => format!(".{}.partial.{}", stem, ext.to_string_lossy()),
        None => format!(".{}.partial", stem),
    };
    output.with_file_name(name)
}

/// Convert one or more masters into the final file at `output`.
///
/// Single-input formats accept exactly one master. The manifest format
/// takes any number and writes its manifest under `scratch_dir`. The
/// transcoder writes to a staging file that is renamed onto `output` only
/// once it succeeds, so a failed or cancelled conversion leaves any
/// existing `output` untouched.
pub async fn convert_to_final(
    tool: &dyn Transcoder,
    masters: &[PathBuf],
    format: TargetFormat,
    bitrate_kbps: Option<u32>,
    output: &Path,
    scratch_dir: &Path,
) -> Result<PathBuf> {
    if masters.is_empty() {
        return Err(NarratorError::Validation("no master track to convert".to_string()));
    }
    if !format.uses_manifest() && masters.len() > 1 {
        return Err(NarratorError::Validation(format!(
            "{} output takes a single input, got {}",
            format,
            masters.len()
        )));
    }

    let bitrate_kbps = bitrate_kbps.or(format.default_bitrate_kbps());
    let staging = PartialFile::new(staging_path(output));
    staging.discard();

    // Held until the transcoder has finished, dropped on every path
    let manifest = if format.uses_manifest() {
        Some(write_manifest(masters, scratch_dir)?)
    } else {
        None
    };

    let input = match &manifest {
        Some(file) => TranscodeInput::Manifest(file.path()),
        None => TranscodeInput::Single(&masters[0]),
    };
    let request = TranscodeRequest {
        input,
        codec: format.codec(),
        bitrate_kbps,
        output: staging.path(),
    };

    debug!("Converting to {} at {}", format, output.display());
    tool.transcode(&request).await?;

    if !staging.path().is_file() {
        return Err(NarratorError::ToolFailure {
            tool: "transcoder".to_string(),
            message: format!("no output written for {}", output.display()),
        });
    }

    std::fs::rename(staging.path(), output)?;
    staging.keep();
    Ok(output.to_path_buf())
}
