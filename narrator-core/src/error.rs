use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NarratorError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error(
        "Speech engine timed out {attempts} time(s) (limit {}s per attempt)",
        timeout.as_secs()
    )]
    EngineTimeout { attempts: u32, timeout: Duration },

    #[error("Speech engine rejected the text: {0}")]
    EngineRejection(String),

    #[error("{tool} failed: {message}")]
    ToolFailure { tool: String, message: String },

    #[error("{tool} timed out after {}s", timeout.as_secs())]
    ToolTimeout { tool: String, timeout: Duration },

    #[error("System command '{tool}' could not be started: {source}")]
    ToolUnavailable {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not create temporary workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NarratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NarratorError::ToolFailure {
            tool: "sox".to_string(),
            message: "unknown format".to_string(),
        };
        assert_eq!(err.to_string(), "sox failed: unknown format");

        let err = NarratorError::EngineTimeout {
            attempts: 3,
            timeout: Duration::from_secs(300),
        };
        assert_eq!(
            err.to_string(),
            "Speech engine timed out 3 time(s) (limit 300s per attempt)"
        );
    }

    #[test]
    fn test_io_error_converts() {
        fn fails() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?
        }
        assert!(matches!(fails(), Err(NarratorError::Io(_))));
    }
}
