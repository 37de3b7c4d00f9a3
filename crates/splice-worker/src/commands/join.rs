//! Join clips and stream progress to stdout.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::warn;

use splice_models::ProcessingConfig;
use splice_worker::{ConcatRequest, JoinCoordinator, WorkerConfig};

/// Encoding overrides; anything left unset keeps the default.
#[derive(Args, Debug)]
pub struct EncodingArgs {
    /// Output frame rate, also used to convert trim frames to seconds
    #[arg(long)]
    framerate: Option<f64>,

    /// Frames dropped from the start of every clip
    #[arg(long, default_value = "0")]
    trim_start: u32,

    /// Frames dropped from the end of every clip
    #[arg(long, default_value = "0")]
    trim_end: u32,

    /// Video codec
    #[arg(long)]
    codec: Option<String>,

    /// Encoder preset (libx264/libx265 only)
    #[arg(long)]
    quality: Option<String>,

    /// Output size as WIDTHxHEIGHT
    #[arg(long)]
    resolution: Option<String>,

    /// Video bitrate, e.g. 2M
    #[arg(long)]
    bitrate: Option<String>,
}

impl EncodingArgs {
    fn into_config(self) -> ProcessingConfig {
        let mut config = ProcessingConfig::default().with_trims(self.trim_start, self.trim_end);
        if let Some(framerate) = self.framerate {
            config = config.with_framerate(framerate);
        }
        if let Some(codec) = self.codec {
            config.codec = codec;
        }
        if let Some(quality) = self.quality {
            config.quality = quality;
        }
        config.resolution = self.resolution;
        config.bitrate = self.bitrate;
        config
    }
}

pub async fn run(
    config: WorkerConfig,
    files: Vec<PathBuf>,
    output: Option<String>,
    encoding: EncodingArgs,
    no_thumbnails: bool,
) -> anyhow::Result<()> {
    let mut coordinator = JoinCoordinator::new(config);
    if no_thumbnails {
        coordinator = coordinator.without_thumbnails();
    }

    let mut clips = Vec::with_capacity(files.len());
    for file in &files {
        let clip = coordinator
            .probe_clip(file)
            .await
            .with_context(|| format!("failed to probe {}", file.display()))?;
        if clip.video.is_none() {
            warn!("{} has no readable video stream", file.display());
        }
        clips.push(clip);
    }

    let mut request = ConcatRequest::new(clips).with_config(encoding.into_config());
    if let Some(name) = output {
        request = request.with_output_filename(name);
    }

    let mut subscription = coordinator.subscribe().await;
    let (ack, handle) = coordinator.start_concat(request).await?;
    println!("{}", serde_json::to_string(&ack)?);

    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else { break };
                if event.job_id != ack.job_id {
                    continue;
                }
                println!("{}", serde_json::to_string(&event)?);
                if event.is_terminal() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, cancelling job {}", ack.job_id);
                handle.cancel();
            }
        }
    }

    let completed = handle.wait().await?;
    eprintln!(
        "Wrote {} ({} bytes)",
        completed.output_path.display(),
        completed.output_size
    );
    Ok(())
}
