//! Thumbnail generation.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::spawn_error;
use crate::error::{MediaError, MediaResult};

/// Maximum thumbnail width; narrower sources keep their size.
pub const THUMBNAIL_MAX_WIDTH: u32 = 320;
/// Default capture position in seconds.
pub const THUMBNAIL_TIMESTAMP: f64 = 1.0;
/// MJPEG quality scale (2-31, lower is better).
const THUMBNAIL_JPEG_QUALITY: &str = "5";

/// Thumbnail capture settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThumbnailOptions {
    pub timestamp: f64,
    pub max_width: u32,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self {
            timestamp: THUMBNAIL_TIMESTAMP,
            max_width: THUMBNAIL_MAX_WIDTH,
        }
    }
}

/// Pick the seek position: clips shorter than the requested timestamp are
/// sampled at their midpoint.
pub fn thumbnail_timestamp(requested: f64, duration: Option<f64>) -> f64 {
    match duration {
        Some(duration) if duration > 0.0 && requested > duration => duration / 2.0,
        _ => requested.max(0.0),
    }
}

/// Filter that shrinks wide frames to `max_width`, keeping aspect ratio and even height.
pub fn filter_thumbnail(max_width: u32) -> String {
    format!("scale='min({},iw)':-2", max_width)
}

/// Decode one frame at `timestamp` and return it as JPEG bytes.
pub async fn capture_thumbnail(
    ffmpeg: &Path,
    video_path: impl AsRef<Path>,
    timestamp: f64,
    max_width: u32,
) -> MediaResult<Vec<u8>> {
    let video_path = video_path.as_ref();

    let output = Command::new(ffmpeg)
        .args(["-v", "error", "-ss"])
        .arg(format!("{:.3}", timestamp))
        .arg("-i")
        .arg(video_path)
        .args(["-frames:v", "1", "-vf"])
        .arg(filter_thumbnail(max_width))
        .args([
            "-f",
            "image2pipe",
            "-c:v",
            "mjpeg",
            "-q:v",
            THUMBNAIL_JPEG_QUALITY,
            "pipe:1",
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| spawn_error(ffmpeg, e))?;

    if !output.status.success() {
        return Err(MediaError::ffmpeg_failed(
            format!("thumbnail capture failed for {}", video_path.display()),
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
            output.status.code(),
        ));
    }
    if output.stdout.is_empty() {
        return Err(MediaError::ffmpeg_failed(
            format!("no frame decoded at {:.3}s", timestamp),
            None,
            output.status.code(),
        ));
    }

    Ok(output.stdout)
}

/// Capture a thumbnail and encode it as base64 text.
pub async fn generate_thumbnail(
    ffmpeg: &Path,
    video_path: impl AsRef<Path>,
    options: ThumbnailOptions,
    duration: Option<f64>,
) -> MediaResult<String> {
    let timestamp = thumbnail_timestamp(options.timestamp, duration);
    let jpeg = capture_thumbnail(ffmpeg, video_path, timestamp, options.max_width).await?;
    Ok(STANDARD.encode(jpeg))
}
