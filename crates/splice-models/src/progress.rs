//! Progress event schema.
//!
//! Events are delivered to every subscribed observer and serialized as-is
//! onto client connections.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{JobId, JobStage};

/// Why a job ended in the `error` stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobErrorKind {
    /// The FFmpeg binary could not be found
    ToolMissing,
    /// FFmpeg ran and exited non-zero
    FfmpegFailed,
    /// Stopped on request
    Cancelled,
    /// Anything else, e.g. an I/O error while waiting on the process
    Other,
}

impl JobErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobErrorKind::ToolMissing => "tool_missing",
            JobErrorKind::FfmpegFailed => "ffmpeg_failed",
            JobErrorKind::Cancelled => "cancelled",
            JobErrorKind::Other => "other",
        }
    }
}

/// A single stage report for a join job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressEvent {
    /// Job the event belongs to
    pub job_id: JobId,

    /// Stage reached
    pub stage: JobStage,

    /// Percentage (0-100)
    pub progress: u8,

    /// Human-readable message
    pub message: String,

    /// Output file location (complete only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    /// Output file name (complete only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_filename: Option<String>,

    /// Output size in bytes (complete only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_size: Option<u64>,

    /// Failure classification (error only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<JobErrorKind>,

    /// Diagnostic text from the external tool (error only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    fn stage(job_id: &JobId, stage: JobStage, message: impl Into<String>) -> Self {
        Self {
            job_id: job_id.clone(),
            stage,
            progress: stage.progress(),
            message: message.into(),
            output_path: None,
            output_filename: None,
            output_size: None,
            error_kind: None,
            details: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a preparing event.
    pub fn preparing(job_id: &JobId, clip_count: usize) -> Self {
        Self::stage(
            job_id,
            JobStage::Preparing,
            format!("Starting concatenation of {} clips", clip_count),
        )
    }

    /// Create a processing event.
    pub fn processing(job_id: &JobId) -> Self {
        Self::stage(job_id, JobStage::Processing, "Transcoding")
    }

    /// Create a completion event.
    pub fn complete(job_id: &JobId, output_path: &Path, output_size: u64) -> Self {
        let mut event = Self::stage(
            job_id,
            JobStage::Complete,
            "Concatenation completed successfully",
        );
        event.output_filename = output_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string());
        event.output_path = Some(output_path.to_path_buf());
        event.output_size = Some(output_size);
        event
    }

    /// Create an error event.
    pub fn error(job_id: &JobId, kind: JobErrorKind, message: impl Into<String>) -> Self {
        let mut event = Self::stage(job_id, JobStage::Error, message);
        event.error_kind = Some(kind);
        event
    }

    /// Create an error event carrying the tool's diagnostic output.
    pub fn error_with_details(
        job_id: &JobId,
        kind: JobErrorKind,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        let mut event = Self::error(job_id, kind, message);
        event.details = Some(details.into());
        event
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_constructors_set_progress() {
        let id = JobId::from_string("job-1");
        assert_eq!(ProgressEvent::preparing(&id, 3).progress, 0);
        assert_eq!(ProgressEvent::processing(&id).progress, 10);
        assert_eq!(
            ProgressEvent::complete(&id, Path::new("out/a.mp4"), 5).progress,
            100
        );
        assert_eq!(
            ProgressEvent::error(&id, JobErrorKind::Other, "boom").progress,
            0
        );
    }

    #[test]
    fn test_preparing_message_counts_clips() {
        let event = ProgressEvent::preparing(&JobId::from_string("j"), 4);
        assert_eq!(event.message, "Starting concatenation of 4 clips");
    }

    #[test]
    fn test_complete_carries_output() {
        let event = ProgressEvent::complete(&JobId::new(), Path::new("output/joined.mp4"), 1024);
        assert_eq!(event.output_filename.as_deref(), Some("joined.mp4"));
        assert_eq!(event.output_size, Some(1024));
        assert!(event.is_terminal());
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let event = ProgressEvent::processing(&JobId::from_string("j"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["stage"], "processing");
        assert!(json.get("output_path").is_none());
        assert!(json.get("details").is_none());
        assert!(json.get("error_kind").is_none());
    }

    #[test]
    fn test_error_kind_serialized_on_error_events() {
        let id = JobId::from_string("j");
        let missing = ProgressEvent::error(&id, JobErrorKind::ToolMissing, "ffmpeg not found");
        let failed = ProgressEvent::error_with_details(
            &id,
            JobErrorKind::FfmpegFailed,
            "FFmpeg failed",
            "Invalid argument",
        );

        let missing_json = serde_json::to_value(&missing).unwrap();
        let failed_json = serde_json::to_value(&failed).unwrap();
        assert_eq!(missing_json["error_kind"], "tool_missing");
        assert_eq!(failed_json["error_kind"], "ffmpeg_failed");
        assert_eq!(failed_json["details"], "Invalid argument");
        assert_eq!(JobErrorKind::Cancelled.as_str(), "cancelled");
    }
}
