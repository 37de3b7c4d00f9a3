//! Clip metadata models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Unique identifier for an uploaded clip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ClipId(pub String);

impl ClipId {
    /// Generate a new random clip ID.
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

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClipId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Technical properties of a clip's primary video stream.
///
/// Extraction is all-or-nothing: either every field here was read from the
/// stream, or the clip carries no `VideoStreamInfo` at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoStreamInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps), always > 0
    pub fps: f64,
    /// Total number of frames
    pub frame_count: u64,
}

impl VideoStreamInfo {
    /// Build stream info, rejecting geometry or frame rates that cannot be used.
    pub fn new(width: u32, height: u32, fps: f64, frame_count: u64) -> Option<Self> {
        if width == 0 || height == 0 || !fps.is_finite() || fps <= 0.0 {
            return None;
        }
        Some(Self {
            width,
            height,
            fps,
            frame_count,
        })
    }

    /// Duration in seconds, derived as `frame_count / fps`.
    pub fn duration(&self) -> f64 {
        self.frame_count as f64 / self.fps
    }
}

/// Immutable metadata for one source clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipMetadata {
    /// Clip ID
    pub id: ClipId,

    /// Original file name
    pub filename: String,

    /// Location of the source file
    pub path: PathBuf,

    /// Video stream properties (absent when the stream could not be read)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoStreamInfo>,

    /// Whether the file carries at least one audio stream
    #[serde(default)]
    pub has_audio: bool,

    /// File size in bytes
    #[serde(default)]
    pub file_size: u64,

    /// Base64-encoded JPEG still
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_base64: Option<String>,
}

impl ClipMetadata {
    /// Create metadata for a file with nothing extracted yet.
    pub fn new(id: ClipId, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            id,
            filename,
            path,
            video: None,
            has_audio: false,
            file_size: 0,
            thumbnail_base64: None,
        }
    }

    /// Returns metadata with the given video stream properties.
    pub fn with_video(mut self, video: VideoStreamInfo) -> Self {
        self.video = Some(video);
        self
    }

    /// Returns metadata with the audio flag set.
    pub fn with_audio(mut self, has_audio: bool) -> Self {
        self.has_audio = has_audio;
        self
    }

    /// Returns metadata with the file size set.
    pub fn with_file_size(mut self, file_size: u64) -> Self {
        self.file_size = file_size;
        self
    }

    /// Returns metadata with a base64 JPEG thumbnail attached.
    pub fn with_thumbnail(mut self, thumbnail_base64: impl Into<String>) -> Self {
        self.thumbnail_base64 = Some(thumbnail_base64.into());
        self
    }

    pub fn width(&self) -> Option<u32> {
        self.video.map(|v| v.width)
    }

    pub fn height(&self) -> Option<u32> {
        self.video.map(|v| v.height)
    }

    pub fn fps(&self) -> Option<f64> {
        self.video.map(|v| v.fps)
    }

    pub fn frame_count(&self) -> Option<u64> {
        self.video.map(|v| v.frame_count)
    }

    /// Duration in seconds; `None` when the frame rate could not be read.
    pub fn duration(&self) -> Option<f64> {
        self.video.map(|v| v.duration())
    }

    /// Flattened client-facing view with the thumbnail as a data URI.
    pub fn info(&self) -> ClipInfo {
        ClipInfo {
            id: self.id.clone(),
            filename: self.filename.clone(),
            duration: self.duration(),
            width: self.width(),
            height: self.height(),
            fps: self.fps(),
            frame_count: self.frame_count(),
            has_audio: self.has_audio,
            file_size: self.file_size,
            thumbnail: self
                .thumbnail_base64
                .as_ref()
                .map(|b64| format!("data:image/jpeg;base64,{}", b64)),
        }
    }
}

/// Clip information as presented to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipInfo {
    pub id: ClipId,
    pub filename: String,
    pub duration: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    pub frame_count: Option<u64>,
    pub has_audio: bool,
    pub file_size: u64,
    pub thumbnail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_info_rejects_unusable_rate() {
        assert!(VideoStreamInfo::new(640, 480, 0.0, 10).is_none());
        assert!(VideoStreamInfo::new(640, 480, f64::NAN, 10).is_none());
        assert!(VideoStreamInfo::new(0, 480, 24.0, 10).is_none());
        assert!(VideoStreamInfo::new(640, 480, 24.0, 10).is_some());
    }

    #[test]
    fn test_duration_derived_from_frames() {
        let video = VideoStreamInfo::new(1280, 720, 16.0, 48).unwrap();
        let clip = ClipMetadata::new(ClipId::from("a"), "/tmp/a.mp4").with_video(video);
        assert_eq!(clip.duration(), Some(3.0));
        assert_eq!(clip.filename, "a.mp4");
    }

    #[test]
    fn test_missing_video_leaves_all_fields_absent() {
        let clip = ClipMetadata::new(ClipId::from("b"), "/tmp/b.mov");
        assert!(clip.width().is_none());
        assert!(clip.height().is_none());
        assert!(clip.fps().is_none());
        assert!(clip.duration().is_none());
        assert!(!clip.has_audio);
    }

    #[test]
    fn test_info_renders_thumbnail_data_uri() {
        let clip = ClipMetadata::new(ClipId::from("c"), "c.mp4").with_thumbnail("AAAA");
        let info = clip.info();
        assert_eq!(info.thumbnail.as_deref(), Some("data:image/jpeg;base64,AAAA"));

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["duration"], serde_json::Value::Null);
    }
}
