//! Worker configuration.

use std::path::PathBuf;

use splice_media::ThumbnailOptions;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// FFmpeg binary (name on PATH or absolute path)
    pub ffmpeg_bin: PathBuf,
    /// FFprobe binary (name on PATH or absolute path)
    pub ffprobe_bin: PathBuf,
    /// Directory joined outputs are written to
    pub output_dir: PathBuf,
    /// Thumbnail width bound in pixels
    pub thumbnail_width: u32,
    /// Thumbnail capture position in seconds
    pub thumbnail_timestamp: f64,
    /// Events buffered per observer before it is considered stalled and dropped
    pub observer_buffer: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            ffprobe_bin: PathBuf::from("ffprobe"),
            output_dir: PathBuf::from("output"),
            thumbnail_width: 320,
            thumbnail_timestamp: 1.0,
            observer_buffer: 64,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ffmpeg_bin: std::env::var("SPLICE_FFMPEG_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffmpeg_bin),
            ffprobe_bin: std::env::var("SPLICE_FFPROBE_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffprobe_bin),
            output_dir: std::env::var("SPLICE_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            thumbnail_width: std::env::var("SPLICE_THUMBNAIL_WIDTH")
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .filter(|w| *w > 0)
                .unwrap_or(defaults.thumbnail_width),
            thumbnail_timestamp: std::env::var("SPLICE_THUMBNAIL_TIMESTAMP")
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|t| t.is_finite() && *t >= 0.0)
                .unwrap_or(defaults.thumbnail_timestamp),
            observer_buffer: std::env::var("SPLICE_OBSERVER_BUFFER")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.observer_buffer),
        }
    }

    pub fn thumbnail_options(&self) -> ThumbnailOptions {
        ThumbnailOptions {
            timestamp: self.thumbnail_timestamp,
            max_width: self.thumbnail_width,
        }
    }
}
