//! One chunk of text to one audio fragment, with timeout and retry.

use super::{SpeechEngine, VoiceSettings};
use crate::error::NarratorError;
use crate::text::Chunk;
use crate::tool::PartialFile;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default per-call engine timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
/// Default number of attempts when the engine times out.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Timeout and retry limits for synthesis calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisPolicy {
    /// Wall-clock limit for a single engine call
    pub timeout: Duration,
    /// Attempts before a timing-out chunk is reported failed
    pub max_attempts: u32,
}

impl Default for SynthesisPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// A synthesized audio file for one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Ordinal of the chunk it was made from
    pub ordinal: usize,
    pub path: PathBuf,
}

/// Result of synthesizing one chunk.
#[derive(Debug)]
pub enum SynthesisResult {
    Fragment(Fragment),
    /// Nothing to speak; the engine was not invoked
    Skipped { ordinal: usize },
    Failed { ordinal: usize, error: NarratorError },
}

impl SynthesisResult {
    /// Ordinal of the chunk this result belongs to.
    pub fn ordinal(&self) -> usize {
        match self {
            SynthesisResult::Fragment(fragment) => fragment.ordinal,
            SynthesisResult::Skipped { ordinal } | SynthesisResult::Failed { ordinal, .. } => *ordinal,
        }
    }
}

/// Synthesize one chunk into `destination`.
///
/// Timeouts are retried up to `policy.max_attempts`, removing any partial
/// output before each new attempt. Engine rejections are not retried. Success
/// requires the file to exist afterwards.
pub async fn synthesize(
    engine: &dyn SpeechEngine,
    settings: &VoiceSettings,
    policy: &SynthesisPolicy,
    chunk: &Chunk,
    destination: &Path,
) -> SynthesisResult {
    let ordinal = chunk.ordinal;

    if chunk.text.trim().is_empty() {
        warn!("Empty text chunk {} provided, skipping generation", ordinal);
        return SynthesisResult::Skipped { ordinal };
    }

    if let Some(parent) = destination.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            return SynthesisResult::Failed {
                ordinal,
                error: NarratorError::Io(e),
            };
        }
    }

    let output = PartialFile::new(destination);
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        output.discard();
        debug!(
            "Synthesizing chunk {} ({} chars, attempt {}/{})",
            ordinal,
            chunk.char_count(),
            attempt,
            max_attempts
        );

        let call = engine.speak(&chunk.text, settings, destination);
        match tokio::time::timeout(policy.timeout, call).await {
            Err(_) => {
                warn!(
                    "{} timed out on chunk {} after {}s (attempt {}/{})",
                    engine.name(),
                    ordinal,
                    policy.timeout.as_secs(),
                    attempt,
                    max_attempts
                );
            }
            Ok(Err(e)) => {
                let error = match e {
                    NarratorError::ToolFailure { message, .. } => NarratorError::EngineRejection(message),
                    other => other,
                };
                return SynthesisResult::Failed { ordinal, error };
            }
            Ok(Ok(())) => {
                if !destination.is_file() {
                    return SynthesisResult::Failed {
                        ordinal,
                        error: NarratorError::EngineRejection(format!(
                            "{} reported success but wrote no file at {}",
                            engine.name(),
                            destination.display()
                        )),
                    };
                }
                return SynthesisResult::Fragment(Fragment {
                    ordinal,
                    path: output.keep(),
                });
            }
        }
    }

    SynthesisResult::Failed {
        ordinal,
        error: NarratorError::EngineTimeout {
            attempts: max_attempts,
            timeout: policy.timeout,
        },
    }
}
