//! Running external command-line tools and guarding their output files.

use crate::error::{NarratorError, Result};
use log::debug;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Run a tool to completion, optionally bounded by a timeout.
///
/// The child is killed if the returned future is dropped, which is what
/// happens on timeout or when the caller is cancelled. A non-zero exit
/// becomes `ToolFailure` carrying the tool's stderr.
pub async fn run_tool(mut command: Command, tool: &str, timeout: Option<Duration>) -> Result<()> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!("Running {:?}", command.as_std());

    let child = command.spawn().map_err(|source| NarratorError::ToolUnavailable {
        tool: tool.to_string(),
        source,
    })?;

    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| NarratorError::ToolTimeout {
                tool: tool.to_string(),
                timeout: limit,
            })??,
        None => child.wait_with_output().await?,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        let message = if stderr.is_empty() {
            format!("exited with {}", output.status)
        } else {
            format!("exited with {}: {}", output.status, stderr)
        };
        return Err(NarratorError::ToolFailure {
            tool: tool.to_string(),
            message,
        });
    }

    Ok(())
}

/// An output file that is deleted on drop unless kept.
///
/// Wraps every path an external tool writes to, so a failed, timed-out or
/// cancelled call never leaves a partial file behind.
#[derive(Debug)]
pub struct PartialFile {
    path: PathBuf,
    armed: bool,
}

impl PartialFile {
    /// Guard `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    /// The guarded path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove whatever is currently at the path.
    pub fn discard(&self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                debug!("Could not remove partial file {}: {}", self.path.display(), e);
            }
        }
    }

    /// Stop guarding and hand back the path.
    pub fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.armed {
            self.discard();
        }
    }
}
