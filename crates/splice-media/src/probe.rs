//! FFprobe stream inspection.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use splice_models::VideoStreamInfo;

use crate::command::spawn_error;
use crate::error::{MediaError, MediaResult};

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

/// Read the first video stream's geometry, frame rate and frame count.
///
/// Returns `Ok(None)` when ffprobe ran but found no usable video stream
/// (missing stream, zero size, or no frame rate).
pub async fn probe_video_stream(
    ffprobe: &Path,
    path: impl AsRef<Path>,
) -> MediaResult<Option<VideoStreamInfo>> {
    let path = path.as_ref();

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
            "-select_streams",
            "v:0",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| spawn_error(ffprobe, e))?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("FFprobe could not open {}", path.display()),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
    Ok(video_stream_from_probe(&probe))
}

fn video_stream_from_probe(probe: &FfprobeOutput) -> Option<VideoStreamInfo> {
    let stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref().unwrap_or("video") == "video")?;

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_frame_rate))?;

    // Prefer the container's frame count; fall back to duration × rate.
    let frame_count = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|n| *n > 0)
        .or_else(|| {
            let duration = stream
                .duration
                .as_deref()
                .or(probe.format.as_ref().and_then(|f| f.duration.as_deref()))
                .and_then(|d| d.parse::<f64>().ok())
                .filter(|d| d.is_finite() && *d > 0.0)?;
            Some((duration * fps).round() as u64)
        })
        .unwrap_or(0);

    VideoStreamInfo::new(
        stream.width.unwrap_or(0),
        stream.height.unwrap_or(0),
        fps,
        frame_count,
    )
}

/// Check whether the file has at least one audio stream.
pub async fn probe_has_audio(ffprobe: &Path, path: impl AsRef<Path>) -> MediaResult<bool> {
    let path = path.as_ref();

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "quiet",
            "-select_streams",
            "a:0",
            "-show_entries",
            "stream=index",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| spawn_error(ffprobe, e))?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("FFprobe audio check failed for {}", path.display()),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty())
}

/// Parse frame rate string (e.g., "30/1" or "29.97"). Zero or undefined rates yield `None`.
fn parse_frame_rate(s: &str) -> Option<f64> {
    let fps = if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den <= 0.0 {
            return None;
        }
        num / den
    } else {
        s.parse().ok()?
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Option<VideoStreamInfo> {
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        video_stream_from_probe(&probe)
    }

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
        assert!(parse_frame_rate("N/A").is_none());
    }

    #[test]
    fn test_uses_nb_frames_when_present() {
        let info = parse(
            r#"{"streams":[{"codec_type":"video","width":1280,"height":720,
                "avg_frame_rate":"16/1","r_frame_rate":"16/1","nb_frames":"48"}],
                "format":{"duration":"3.5"}}"#,
        )
        .unwrap();
        assert_eq!(info.frame_count, 48);
        assert_eq!(info.duration(), 3.0);
    }

    #[test]
    fn test_frame_count_falls_back_to_duration() {
        let info = parse(
            r#"{"streams":[{"codec_type":"video","width":640,"height":480,
                "avg_frame_rate":"0/0","r_frame_rate":"25/1"}],
                "format":{"duration":"2.0"}}"#,
        )
        .unwrap();
        assert_eq!(info.fps, 25.0);
        assert_eq!(info.frame_count, 50);
    }

    #[test]
    fn test_no_frame_rate_means_no_stream_info() {
        assert!(parse(
            r#"{"streams":[{"codec_type":"video","width":640,"height":480,
                "avg_frame_rate":"0/0","r_frame_rate":"0/0"}]}"#
        )
        .is_none());
        assert!(parse(r#"{"streams":[]}"#).is_none());
    }

    #[tokio::test]
    async fn test_missing_ffprobe_is_tool_missing() {
        let err = probe_has_audio(Path::new("/nonexistent/ffprobe"), "clip.mp4")
            .await
            .unwrap_err();
        assert!(err.is_tool_missing());
    }
}
