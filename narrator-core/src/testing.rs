//! In-process stand-ins for the speech engine, concatenator and transcoder.
//!
//! They write real files so the stages can verify outputs, record every call,
//! and can be told to hang, reject or fail.

use crate::audio::{Concatenator, TranscodeInput, TranscodeRequest, Transcoder};
use crate::error::{NarratorError, Result};
use crate::tts::{SpeechEngine, VoiceSettings};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What the fake engine does on one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineBehavior {
    /// Write `audio:<text>` to the output
    Succeed,
    /// Wait, then succeed
    SucceedAfter(Duration),
    /// Write a partial file, then never finish
    Hang,
    /// Exit non-zero with this stderr
    Reject(String),
    /// Report success without writing anything
    NoFile,
}

type BehaviorFn = dyn Fn(&str, usize) -> EngineBehavior + Send + Sync;

/// A speech engine whose behavior is chosen per call from the text and the
/// number of earlier calls with the same text.
pub struct FakeEngine {
    behavior: Box<BehaviorFn>,
    calls: Mutex<Vec<String>>,
    attempts: Mutex<HashMap<String, usize>>,
    leftovers: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeEngine {
    pub fn new(behavior: impl Fn(&str, usize) -> EngineBehavior + Send + Sync + 'static) -> Self {
        Self {
            behavior: Box::new(behavior),
            calls: Mutex::new(Vec::new()),
            attempts: Mutex::new(HashMap::new()),
            leftovers: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(|_, _| EngineBehavior::Succeed)
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Texts spoken, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Most calls that were ever running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Calls that found a file already sitting at their output path.
    pub fn partial_files_seen_at_start(&self) -> usize {
        self.leftovers.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechEngine for FakeEngine {
    async fn speak(&self, text: &str, _settings: &VoiceSettings, output_path: &Path) -> Result<()> {
        if output_path.exists() {
            self.leftovers.fetch_add(1, Ordering::SeqCst);
        }
        self.calls.lock().unwrap().push(text.to_string());
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let count = attempts.entry(text.to_string()).or_insert(0);
            let attempt = *count;
            *count += 1;
            attempt
        };

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        let result = self.perform((self.behavior)(text, attempt), text, output_path).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn fragment_extension(&self) -> &str {
        "aiff"
    }

    fn name(&self) -> &str {
        "fake-tts"
    }
}

impl FakeEngine {
    async fn perform(&self, behavior: EngineBehavior, text: &str, output_path: &Path) -> Result<()> {
        match behavior {
            EngineBehavior::Succeed => {
                std::fs::write(output_path, format!("audio:{}", text))?;
                Ok(())
            }
            EngineBehavior::SucceedAfter(delay) => {
                tokio::time::sleep(delay).await;
                std::fs::write(output_path, format!("audio:{}", text))?;
                Ok(())
            }
            EngineBehavior::Hang => {
                std::fs::write(output_path, b"partial")?;
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
            EngineBehavior::Reject(stderr) => Err(NarratorError::ToolFailure {
                tool: "fake-tts".to_string(),
                message: format!("exited with exit status: 1: {}", stderr),
            }),
            EngineBehavior::NoFile => Ok(()),
        }
    }
}

/// Lets a test keep a handle on the engine it hands to a pipeline.
#[async_trait]
impl SpeechEngine for Arc<FakeEngine> {
    async fn speak(&self, text: &str, settings: &VoiceSettings, output_path: &Path) -> Result<()> {
        (**self).speak(text, settings, output_path).await
    }

    fn fragment_extension(&self) -> &str {
        (**self).fragment_extension()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

fn join_contents(inputs: &[PathBuf]) -> Result<String> {
    let mut joined = String::new();
    for input in inputs {
        joined.push_str(&std::fs::read_to_string(input)?);
    }
    Ok(joined)
}

/// A concatenator that joins file contents as text.
pub struct FakeConcatenator {
    fail_with: Option<String>,
    calls: Mutex<Vec<Vec<PathBuf>>>,
}

impl FakeConcatenator {
    pub fn new() -> Self {
        Self {
            fail_with: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Write a partial output, then fail with `stderr`.
    pub fn failing(stderr: &str) -> Self {
        Self {
            fail_with: Some(stderr.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Input lists of every call.
    pub fn calls(&self) -> Vec<Vec<PathBuf>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Concatenator for FakeConcatenator {
    async fn concat(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
        self.calls.lock().unwrap().push(inputs.to_vec());
        if let Some(stderr) = &self.fail_with {
            std::fs::write(output, b"partial")?;
            return Err(NarratorError::ToolFailure {
                tool: "sox".to_string(),
                message: stderr.clone(),
            });
        }
        std::fs::write(output, join_contents(inputs)?)?;
        Ok(())
    }
}

/// A transcoder call as seen by the fake, with manifest inputs resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub inputs: Vec<PathBuf>,
    pub used_manifest: bool,
    pub codec: String,
    pub bitrate_kbps: Option<u32>,
    pub output: PathBuf,
}

/// A transcoder that copies the joined input contents to the output.
pub struct FakeTranscoder {
    fail_with: Option<String>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeTranscoder {
    pub fn new() -> Self {
        Self {
            fail_with: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Write a partial output, then fail with `stderr`.
    pub fn failing(stderr: &str) -> Self {
        Self {
            fail_with: Some(stderr.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn parse_manifest(path: &Path) -> Result<Vec<PathBuf>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter_map(|line| line.strip_prefix("file '")?.strip_suffix('\''))
        .map(|quoted| PathBuf::from(quoted.replace("'\\''", "'")))
        .collect())
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn transcode(&self, request: &TranscodeRequest<'_>) -> Result<()> {
        let (inputs, used_manifest) = match request.input {
            TranscodeInput::Single(path) => (vec![path.to_path_buf()], false),
            TranscodeInput::Manifest(path) => (parse_manifest(path)?, true),
        };
        self.requests.lock().unwrap().push(RecordedRequest {
            inputs: inputs.clone(),
            used_manifest,
            codec: request.codec.to_string(),
            bitrate_kbps: request.bitrate_kbps,
            output: request.output.to_path_buf(),
        });

        if let Some(stderr) = &self.fail_with {
            std::fs::write(request.output, b"partial")?;
            return Err(NarratorError::ToolFailure {
                tool: "ffmpeg".to_string(),
                message: stderr.clone(),
            });
        }
        std::fs::write(request.output, join_contents(&inputs)?)?;
        Ok(())
    }
}
