//! FFmpeg CLI wrapper for clip probing and concatenation.
//!
//! This crate provides:
//! - Per-clip metadata extraction via FFprobe
//! - Thumbnail capture
//! - Trim/concat filter graph construction
//! - A process runner with stderr capture and optional cancellation

pub mod command;
pub mod concat;
pub mod error;
pub mod metadata;
pub mod probe;
pub mod thumbnail;

pub use command::{check_ffmpeg, check_ffprobe, check_tool, FfmpegRunner, RunningFfmpeg};
pub use concat::{output_has_audio, plan_trims, ClipTrim, ConcatCommand, FilterGraphBuilder};
pub use error::{MediaError, MediaResult};
pub use metadata::MetadataExtractor;
pub use probe::{probe_has_audio, probe_video_stream};
pub use thumbnail::{generate_thumbnail, ThumbnailOptions};
