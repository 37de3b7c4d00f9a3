//! Concatenation command building.
//!
//! Produces the complete FFmpeg invocation that trims each clip and joins
//! them with a single `concat` filter. Two policies are applied on purpose
//! and must not be generalized without a product decision:
//!
//! - **Audio follows the first clip.** Only `clips[0].has_audio` decides
//!   whether the output carries audio; other clips' flags are ignored.
//! - **Uniform frame rate.** Frame counts are converted to seconds with the
//!   configured output rate, not each clip's own rate.
//!
//! Every clip after the first loses one extra leading frame: the boundary
//! frame that would otherwise appear twice at each join.

use std::path::{Path, PathBuf};

use splice_models::{ClipMetadata, ProcessingConfig};

use crate::error::{MediaError, MediaResult};

/// Label of the joined video stream.
pub const OUT_VIDEO: &str = "outv";
/// Label of the joined audio stream.
pub const OUT_AUDIO: &str = "outa";

/// Whether the joined output carries audio: decided by the first clip alone.
pub fn output_has_audio(clips: &[ClipMetadata]) -> bool {
    clips.first().map(|c| c.has_audio).unwrap_or(false)
}

/// Seconds removed from one clip's head and where its tail is cut.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClipTrim {
    /// Trim start in seconds, `None` to keep the head intact
    pub start: Option<f64>,
    /// Absolute end position in seconds, `None` to keep the tail intact
    pub end: Option<f64>,
}

impl ClipTrim {
    pub fn is_passthrough(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Filter arguments shared by `trim` and `atrim`, e.g. `start=0.0625:end=2.9375`.
    fn filter_args(&self) -> String {
        let mut args = Vec::with_capacity(2);
        if let Some(start) = self.start {
            args.push(format!("start={}", start));
        }
        if let Some(end) = self.end {
            args.push(format!("end={}", end));
        }
        args.join(":")
    }
}

/// Compute the trim for every clip, in order.
///
/// Leader: `trim_start_frames / framerate`, only when non-zero.
/// Followers: always `(1 + trim_start_frames) / framerate`.
/// Tails: `duration - trim_end_frames / framerate` when configured.
pub fn plan_trims(clips: &[ClipMetadata], config: &ProcessingConfig) -> MediaResult<Vec<ClipTrim>> {
    let multi = clips.len() > 1;

    clips
        .iter()
        .enumerate()
        .map(|(i, clip)| {
            let start_frames = if i == 0 {
                config.trim_start_frames
            } else {
                1 + config.trim_start_frames
            };
            let start = (start_frames > 0).then(|| config.frames_to_secs(start_frames));

            let needs_rate = multi || start.is_some() || config.trim_end_frames > 0;
            if needs_rate && clip.fps().is_none() {
                return Err(MediaError::invalid_input(format!(
                    "clip {} ({}) has no known frame rate",
                    clip.id, clip.filename
                )));
            }

            let end = if config.trim_end_frames > 0 {
                let duration = clip.duration().filter(|d| *d > 0.0).ok_or_else(|| {
                    MediaError::invalid_input(format!(
                        "clip {} has no known duration to trim its end",
                        clip.id
                    ))
                })?;
                let end = duration - config.frames_to_secs(config.trim_end_frames);
                if end <= start.unwrap_or(0.0) {
                    return Err(MediaError::invalid_input(format!(
                        "clip {} is too short for the configured trims",
                        clip.id
                    )));
                }
                Some(end)
            } else {
                None
            };

            Ok(ClipTrim { start, end })
        })
        .collect()
}

/// A fully resolved FFmpeg invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcatCommand {
    inputs: Vec<PathBuf>,
    filter_complex: Option<String>,
    maps: Vec<String>,
    encoding_args: Vec<String>,
    output: PathBuf,
    has_audio: bool,
}

impl ConcatCommand {
    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    pub fn filter_complex(&self) -> Option<&str> {
        self.filter_complex.as_deref()
    }

    pub fn has_audio(&self) -> bool {
        self.has_audio
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments (without the program name).
    ///
    /// Order matters to FFmpeg: inputs, then the graph, then stream maps,
    /// then encoding options, then the output path.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
        ];

        for input in &self.inputs {
            args.push("-i".to_string());
            args.push(input.to_string_lossy().to_string());
        }

        if let Some(graph) = &self.filter_complex {
            args.push("-filter_complex".to_string());
            args.push(graph.clone());
        }

        for map in &self.maps {
            args.push("-map".to_string());
            args.push(map.clone());
        }

        args.extend(self.encoding_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());
        args
    }
}

/// Builds [`ConcatCommand`]s from ordered clips and a processing config.
#[derive(Debug, Clone, Copy)]
pub struct FilterGraphBuilder<'a> {
    config: &'a ProcessingConfig,
}

impl<'a> FilterGraphBuilder<'a> {
    pub fn new(config: &'a ProcessingConfig) -> Self {
        Self { config }
    }

    /// Build the invocation. Pure: nothing is read from or written to disk.
    pub fn build(
        &self,
        clips: &[ClipMetadata],
        output: impl AsRef<Path>,
    ) -> MediaResult<ConcatCommand> {
        self.config.validate()?;
        if clips.is_empty() {
            return Err(MediaError::invalid_input("at least one clip is required"));
        }

        let has_audio = output_has_audio(clips);
        let trims = plan_trims(clips, self.config)?;

        let (filter_complex, maps) = if clips.len() == 1 {
            single_clip_graph(trims[0], has_audio)
        } else {
            let graph = concat_graph(&trims, has_audio);
            (Some(graph), output_maps(has_audio))
        };

        Ok(ConcatCommand {
            inputs: clips.iter().map(|c| c.path.clone()).collect(),
            filter_complex,
            maps,
            encoding_args: self.encoding_args(has_audio),
            output: output.as_ref().to_path_buf(),
            has_audio,
        })
    }

    /// Encoder options: codec, preset, rate, size, bitrates, then passthrough args.
    fn encoding_args(&self, has_audio: bool) -> Vec<String> {
        let config = self.config;
        let mut args = vec!["-c:v".to_string(), config.codec.clone()];

        if config.uses_preset() {
            args.extend(["-preset".to_string(), config.quality.clone()]);
        }

        args.extend(["-r".to_string(), config.framerate.to_string()]);

        if let Some(resolution) = &config.resolution {
            args.extend(["-s".to_string(), resolution.clone()]);
        }

        if let Some(bitrate) = &config.bitrate {
            args.extend(["-b:v".to_string(), bitrate.clone()]);
        }

        if has_audio {
            args.extend(["-c:a".to_string(), config.audio_codec.clone()]);
            if let Some(audio_bitrate) = &config.audio_bitrate {
                args.extend(["-b:a".to_string(), audio_bitrate.clone()]);
            }
        }

        args.extend(config.custom_ffmpeg_args.iter().cloned());
        args
    }
}

fn output_maps(has_audio: bool) -> Vec<String> {
    let mut maps = vec![format!("[{}]", OUT_VIDEO)];
    if has_audio {
        maps.push(format!("[{}]", OUT_AUDIO));
    }
    maps
}

/// A trimmed video segment, timestamps reset so the concat sees a clean start.
fn video_trim(index: usize, trim: ClipTrim, label: &str) -> String {
    format!(
        "[{}:v]trim={},setpts=PTS-STARTPTS[{}]",
        index,
        trim.filter_args(),
        label
    )
}

fn audio_trim(index: usize, trim: ClipTrim, label: &str) -> String {
    format!(
        "[{}:a]atrim={},asetpts=PTS-STARTPTS[{}]",
        index,
        trim.filter_args(),
        label
    )
}

/// One clip: no concat. Without trims the streams are mapped directly.
fn single_clip_graph(trim: ClipTrim, has_audio: bool) -> (Option<String>, Vec<String>) {
    if trim.is_passthrough() {
        let mut maps = vec!["0:v:0".to_string()];
        if has_audio {
            maps.push("0:a:0".to_string());
        }
        return (None, maps);
    }

    let mut parts = vec![video_trim(0, trim, OUT_VIDEO)];
    if has_audio {
        parts.push(audio_trim(0, trim, OUT_AUDIO));
    }
    (Some(parts.join(";")), output_maps(has_audio))
}

/// Per-clip trims followed by one `concat` over every segment in input order.
fn concat_graph(trims: &[ClipTrim], has_audio: bool) -> String {
    let mut parts = Vec::new();
    let mut concat_inputs = String::new();

    for (i, trim) in trims.iter().enumerate() {
        if trim.is_passthrough() {
            concat_inputs.push_str(&format!("[{}:v]", i));
            if has_audio {
                concat_inputs.push_str(&format!("[{}:a]", i));
            }
            continue;
        }

        let v_label = format!("v{}", i);
        parts.push(video_trim(i, *trim, &v_label));
        concat_inputs.push_str(&format!("[{}]", v_label));

        if has_audio {
            let a_label = format!("a{}", i);
            parts.push(audio_trim(i, *trim, &a_label));
            concat_inputs.push_str(&format!("[{}]", a_label));
        }
    }

    let concat = if has_audio {
        format!(
            "{}concat=n={}:v=1:a=1[{}][{}]",
            concat_inputs,
            trims.len(),
            OUT_VIDEO,
            OUT_AUDIO
        )
    } else {
        format!(
            "{}concat=n={}:v=1:a=0[{}]",
            concat_inputs,
            trims.len(),
            OUT_VIDEO
        )
    };
    parts.push(concat);
    parts.join(";")
}
