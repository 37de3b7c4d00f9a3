//! Clip metadata extraction.
//!
//! Extraction degrades field by field: an unreadable video stream leaves the
//! geometry empty, a failed audio probe reports no audio, and a failed
//! thumbnail is simply omitted. Only a file that cannot be read at all is an
//! error.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use splice_models::{ClipId, ClipMetadata};

use crate::command::{FFMPEG, FFPROBE};
use crate::error::{MediaError, MediaResult};
use crate::probe::{probe_has_audio, probe_video_stream};
use crate::thumbnail::{generate_thumbnail, ThumbnailOptions};

/// Probes media files into [`ClipMetadata`] records.
#[derive(Debug, Clone)]
pub struct MetadataExtractor {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    thumbnail: Option<ThumbnailOptions>,
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataExtractor {
    /// Extractor using `ffmpeg`/`ffprobe` from PATH with default thumbnails.
    pub fn new() -> Self {
        Self {
            ffmpeg: PathBuf::from(FFMPEG),
            ffprobe: PathBuf::from(FFPROBE),
            thumbnail: Some(ThumbnailOptions::default()),
        }
    }

    /// Use specific tool binaries.
    pub fn with_tools(mut self, ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self.ffprobe = ffprobe.into();
        self
    }

    /// Set thumbnail options.
    pub fn with_thumbnail(mut self, options: ThumbnailOptions) -> Self {
        self.thumbnail = Some(options);
        self
    }

    /// Skip thumbnail generation.
    pub fn without_thumbnail(mut self) -> Self {
        self.thumbnail = None;
        self
    }

    /// Extract metadata for a file.
    pub async fn extract(&self, id: ClipId, path: impl AsRef<Path>) -> MediaResult<ClipMetadata> {
        let path = path.as_ref();

        let fs_meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| MediaError::extraction(path, e.to_string()))?;
        if !fs_meta.is_file() {
            return Err(MediaError::extraction(path, "not a regular file"));
        }

        let mut clip = ClipMetadata::new(id, path).with_file_size(fs_meta.len());

        let (video, audio) = tokio::join!(
            probe_video_stream(&self.ffprobe, path),
            probe_has_audio(&self.ffprobe, path)
        );

        match video {
            Ok(Some(video)) => clip = clip.with_video(video),
            Ok(None) => warn!(
                "No usable video stream in {}; leaving geometry unset",
                path.display()
            ),
            Err(e) => warn!("Video probe failed for {}: {}", path.display(), e),
        }

        let has_audio = audio.unwrap_or_else(|e| {
            warn!("Audio probe failed for {}: {}", path.display(), e);
            false
        });
        clip = clip.with_audio(has_audio);

        if let Some(options) = self.thumbnail {
            match generate_thumbnail(&self.ffmpeg, path, options, clip.duration()).await {
                Ok(b64) => clip = clip.with_thumbnail(b64),
                Err(e) => debug!("Thumbnail skipped for {}: {}", path.display(), e),
            }
        }

        debug!(
            clip_id = %clip.id,
            width = ?clip.width(),
            height = ?clip.height(),
            fps = ?clip.fps(),
            has_audio = clip.has_audio,
            "Extracted clip metadata"
        );

        Ok(clip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_missing_file_is_extraction_error() {
        let extractor = MetadataExtractor::new();
        let err = extractor
            .extract(ClipId::from("x"), "/nonexistent/clip.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Extraction { .. }));
    }

    #[tokio::test]
    async fn test_missing_tools_degrade_to_partial_metadata() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not really a video").unwrap();

        let extractor = MetadataExtractor::new()
            .with_tools("/nonexistent/ffmpeg", "/nonexistent/ffprobe");
        let clip = extractor
            .extract(ClipId::from("partial"), file.path())
            .await
            .unwrap();

        assert!(clip.video.is_none());
        assert!(clip.duration().is_none());
        assert!(!clip.has_audio);
        assert_eq!(clip.file_size, 18);
        assert!(clip.thumbnail_base64.is_none());
    }

    #[tokio::test]
    #[ignore = "requires ffmpeg"]
    async fn test_extracts_generated_clip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.mp4");
        let status = tokio::process::Command::new("ffmpeg")
            .args(["-y", "-v", "error", "-f", "lavfi", "-i", "testsrc=size=640x360:rate=16"])
            .args(["-f", "lavfi", "-i", "sine=frequency=440", "-t", "2", "-shortest"])
            .arg(&path)
            .status()
            .await
            .unwrap();
        assert!(status.success());

        let clip = MetadataExtractor::new()
            .extract(ClipId::from("sample"), &path)
            .await
            .unwrap();
        assert_eq!(clip.width(), Some(640));
        assert_eq!(clip.fps(), Some(16.0));
        assert!(clip.has_audio);
        assert!(clip.thumbnail_base64.is_some());
    }
}
