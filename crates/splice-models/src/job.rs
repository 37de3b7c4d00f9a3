//! Join job definitions.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::{ClipMetadata, ProcessingConfig};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse progress stage of a join job.
///
/// `Created` never leaves the process; observers only see the other four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    #[default]
    Created,
    Preparing,
    Processing,
    Complete,
    Error,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Created => "created",
            JobStage::Preparing => "preparing",
            JobStage::Processing => "processing",
            JobStage::Complete => "complete",
            JobStage::Error => "error",
        }
    }

    /// Percentage reported alongside this stage.
    pub fn progress(&self) -> u8 {
        match self {
            JobStage::Created | JobStage::Preparing | JobStage::Error => 0,
            JobStage::Processing => 10,
            JobStage::Complete => 100,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStage::Complete | JobStage::Error)
    }

    /// Allowed edges: created → preparing → processing → complete|error.
    pub fn can_transition_to(&self, next: JobStage) -> bool {
        matches!(
            (self, next),
            (JobStage::Created, JobStage::Preparing)
                | (JobStage::Preparing, JobStage::Processing)
                | (JobStage::Processing, JobStage::Complete)
                | (JobStage::Processing, JobStage::Error)
        )
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rejected stage change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid stage transition {from} -> {to}")]
pub struct StageTransitionError {
    pub from: JobStage,
    pub to: JobStage,
}

/// An in-flight join: the ordered clips, resolved config and destination.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Clips in output order
    pub clips: Vec<ClipMetadata>,

    /// Resolved processing config
    pub config: ProcessingConfig,

    /// Destination file
    pub output_path: PathBuf,

    /// Current stage
    #[serde(default)]
    pub stage: JobStage,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new job in the `Created` stage.
    pub fn new(
        clips: Vec<ClipMetadata>,
        config: ProcessingConfig,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            clips,
            config,
            output_path: output_path.into(),
            stage: JobStage::Created,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to the next stage, rejecting out-of-order transitions.
    pub fn advance(&mut self, next: JobStage) -> Result<(), StageTransitionError> {
        if !self.stage.can_transition_to(next) {
            return Err(StageTransitionError {
                from: self.stage,
                to: next,
            });
        }
        self.stage = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }
}
