//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

use splice_models::ConfigError;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The external binary is not installed or not on PATH.
    #[error("{tool} not found; install it and make sure it is on PATH")]
    ToolMissing { tool: String },

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Cannot read media file {path}: {message}")]
    Extraction { path: PathBuf, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a missing-tool error.
    pub fn tool_missing(tool: impl Into<String>) -> Self {
        Self::ToolMissing { tool: tool.into() }
    }

    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an extraction error.
    pub fn extraction(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Extraction {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// True when the failure means the binary is absent rather than the job being bad.
    pub fn is_tool_missing(&self) -> bool {
        matches!(self, MediaError::ToolMissing { .. })
    }

    /// True for rejected input or config, which never reaches a subprocess.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, MediaError::InvalidInput(_) | MediaError::Config(_))
    }

    /// Diagnostic text captured from the tool, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            MediaError::FfmpegFailed { stderr, .. } | MediaError::FfprobeFailed { stderr, .. } => {
                stderr.as_deref().filter(|s| !s.trim().is_empty())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_missing_is_distinct_from_failure() {
        let missing = MediaError::tool_missing("ffmpeg");
        let failed = MediaError::ffmpeg_failed("exit 1", Some("bad graph".into()), Some(1));

        assert!(missing.is_tool_missing());
        assert!(!failed.is_tool_missing());
        assert!(missing.to_string().contains("ffmpeg not found"));
    }

    #[test]
    fn test_diagnostics_ignores_blank_stderr() {
        let blank = MediaError::ffmpeg_failed("exit 1", Some("  \n".into()), Some(1));
        assert!(blank.diagnostics().is_none());

        let real = MediaError::ffmpeg_failed("exit 1", Some("No such filter".into()), Some(1));
        assert_eq!(real.diagnostics(), Some("No such filter"));
    }

    #[test]
    fn test_config_error_counts_as_invalid_input() {
        let err: MediaError = ConfigError::InvalidFramerate(0.0).into();
        assert!(err.is_invalid_input());
    }
}
