//! Concatenating a chapter's fragments into one master track.

use crate::error::{NarratorError, Result};
use crate::tool::{PartialFile, run_tool};
use crate::tts::Fragment;
use async_trait::async_trait;
use log::debug;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

/// An external tool that joins audio files end to end.
#[async_trait]
pub trait Concatenator: Send + Sync {
    /// Join `inputs` in the given order into `output`.
    async fn concat(&self, inputs: &[PathBuf], output: &Path) -> Result<()>;
}

/// Concatenation with `sox in1 ... inN out`.
#[derive(Debug, Clone)]
pub struct SoxConcatenator {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl SoxConcatenator {
    pub fn new(program: Option<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.unwrap_or_else(|| PathBuf::from("sox")),
            timeout,
        }
    }

    pub fn build_args(inputs: &[PathBuf], output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = inputs.iter().map(|p| p.as_os_str().to_owned()).collect();
        args.push(output.as_os_str().to_owned());
        args
    }
}

#[async_trait]
impl Concatenator for SoxConcatenator {
    async fn concat(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(Self::build_args(inputs, output));
        run_tool(cmd, "sox", self.timeout).await
    }
}

/// Combine fragments into a master track at `output`.
///
/// Fragments are ordered by chunk ordinal, whatever order they arrive in. A
/// single fragment still goes through the tool so every master has the
/// tool's headers.
pub async fn combine(tool: &dyn Concatenator, fragments: &[Fragment], output: &Path) -> Result<PathBuf> {
    if fragments.is_empty() {
        return Err(NarratorError::Validation("no audio fragments to combine".to_string()));
    }

    let mut ordered: Vec<&Fragment> = fragments.iter().collect();
    ordered.sort_by_key(|f| f.ordinal);
    let inputs: Vec<PathBuf> = ordered.iter().map(|f| f.path.clone()).collect();

    debug!("Combining {} fragments into {}", inputs.len(), output.display());

    let guard = PartialFile::new(output);
    guard.discard();
    tool.concat(&inputs, output).await?;

    if !output.is_file() {
        return Err(NarratorError::ToolFailure {
            tool: "concatenation".to_string(),
            message: format!("no output written to {}", output.display()),
        });
    }

    Ok(guard.keep())
}
