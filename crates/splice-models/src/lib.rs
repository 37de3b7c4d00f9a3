//! Shared data models for the Splice clip joiner.
//!
//! This crate provides Serde-serializable types for:
//! - Clip metadata extracted from source files
//! - Per-job processing configuration
//! - Join jobs and their stage lifecycle
//! - Progress event schemas

pub mod clip;
pub mod job;
pub mod processing;
pub mod progress;

// Re-export common types
pub use clip::{ClipId, ClipInfo, ClipMetadata, VideoStreamInfo};
pub use job::{Job, JobId, JobStage, StageTransitionError};
pub use processing::{ConfigError, ProcessingConfig};
pub use progress::{JobErrorKind, ProgressEvent};
