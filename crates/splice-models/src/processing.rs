//! Per-job processing configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default encoding preset
pub const DEFAULT_QUALITY: &str = "medium";
/// Default output frame rate. Source footage is stop-motion, hence the low rate.
pub const DEFAULT_FRAMERATE: f64 = 16.0;
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";

/// Codecs that accept a `-preset` option.
pub const PRESET_CODECS: &[&str] = &["libx264", "libx265"];

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("framerate must be a positive number, got {0}")]
    InvalidFramerate(f64),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("resolution must look like WIDTHxHEIGHT, got '{0}'")]
    InvalidResolution(String),
}

/// Processing configuration supplied with each join request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProcessingConfig {
    /// Video codec (e.g., "libx264", "libx265", "libvpx-vp9")
    #[serde(default = "default_codec")]
    pub codec: String,

    /// Encoding preset (fast, medium, slow, veryslow)
    #[serde(default = "default_quality")]
    pub quality: String,

    /// Target resolution such as "1920x1080"; `None` keeps the source size
    #[serde(default)]
    pub resolution: Option<String>,

    /// Output frame rate, also used to convert trim frame counts to seconds
    #[serde(default = "default_framerate")]
    pub framerate: f64,

    /// Video bitrate (e.g., "2M", "1000k")
    #[serde(default)]
    pub bitrate: Option<String>,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: Option<String>,

    /// Frames trimmed from the start of every clip except the first
    #[serde(default)]
    pub trim_start_frames: u32,

    /// Frames trimmed from the end of every clip
    #[serde(default)]
    pub trim_end_frames: u32,

    /// Extra FFmpeg arguments inserted before the output path
    #[serde(default)]
    pub custom_ffmpeg_args: Vec<String>,
}

fn default_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_quality() -> String {
    DEFAULT_QUALITY.to_string()
}
fn default_framerate() -> f64 {
    DEFAULT_FRAMERATE
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> Option<String> {
    Some(DEFAULT_AUDIO_BITRATE.to_string())
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            codec: default_codec(),
            quality: default_quality(),
            resolution: None,
            framerate: DEFAULT_FRAMERATE,
            bitrate: None,
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            trim_start_frames: 0,
            trim_end_frames: 0,
            custom_ffmpeg_args: Vec::new(),
        }
    }
}

impl ProcessingConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new config with the given frame rate.
    pub fn with_framerate(mut self, framerate: f64) -> Self {
        self.framerate = framerate;
        self
    }

    /// Returns a new config with start/end frame trims.
    pub fn with_trims(mut self, trim_start_frames: u32, trim_end_frames: u32) -> Self {
        self.trim_start_frames = trim_start_frames;
        self.trim_end_frames = trim_end_frames;
        self
    }

    /// Check every field that the command builder relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.framerate.is_finite() || self.framerate <= 0.0 {
            return Err(ConfigError::InvalidFramerate(self.framerate));
        }
        if self.codec.trim().is_empty() {
            return Err(ConfigError::Empty("codec"));
        }
        if self.audio_codec.trim().is_empty() {
            return Err(ConfigError::Empty("audio_codec"));
        }
        if let Some(resolution) = &self.resolution {
            parse_resolution(resolution)
                .ok_or_else(|| ConfigError::InvalidResolution(resolution.clone()))?;
        }
        Ok(())
    }

    /// Validate and hand the config back.
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    /// Whether the configured codec understands `-preset`.
    pub fn uses_preset(&self) -> bool {
        PRESET_CODECS.contains(&self.codec.as_str())
    }

    /// Seconds covered by `frames` at the configured frame rate.
    pub fn frames_to_secs(&self, frames: u32) -> f64 {
        frames as f64 / self.framerate
    }
}

/// Parse a "WIDTHxHEIGHT" string into its dimensions.
pub fn parse_resolution(s: &str) -> Option<(u32, u32)> {
    let (w, h) = s.trim().split_once('x')?;
    let w: u32 = w.parse().ok()?;
    let h: u32 = h.parse().ok()?;
    if w == 0 || h == 0 {
        return None;
    }
    Some((w, h))
}
