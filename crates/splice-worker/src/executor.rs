//! Job executor.
//!
//! Runs one prepared FFmpeg invocation and reports its stages through the
//! shared broadcaster. Every execution that gets past the first stage change
//! publishes exactly one terminal event.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;

use splice_media::{ConcatCommand, FfmpegRunner, MediaError};
use splice_models::{Job, JobErrorKind, JobId, JobStage, ProgressEvent};

use crate::broadcast::ProgressBroadcaster;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;

/// Message carried by the error event of a cancelled job.
pub const CANCELLED_MESSAGE: &str = "cancelled";

/// Outcome of a successful job.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedJob {
    pub job_id: JobId,
    pub output_path: PathBuf,
    /// Size of the written file; 0 if it was gone by the time we looked.
    pub output_size: u64,
    pub elapsed: Duration,
}

/// Executes join jobs against an FFmpeg binary.
#[derive(Debug, Clone)]
pub struct JobExecutor {
    ffmpeg: PathBuf,
    broadcaster: Arc<ProgressBroadcaster>,
}

impl JobExecutor {
    pub fn new(ffmpeg: impl Into<PathBuf>, broadcaster: Arc<ProgressBroadcaster>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            broadcaster,
        }
    }

    pub fn ffmpeg(&self) -> &Path {
        &self.ffmpeg
    }

    /// Run `command` for `job`, which must still be in the `Created` stage.
    ///
    /// Publishes preparing before the process is spawned, processing right
    /// after the spawn attempt, then complete or error. A binary that cannot
    /// be spawned still goes through processing before its error event.
    /// Without `cancel_rx` the process always runs to completion.
    pub async fn execute(
        &self,
        job: &mut Job,
        command: &ConcatCommand,
        cancel_rx: Option<watch::Receiver<bool>>,
    ) -> WorkerResult<CompletedJob> {
        let logger = JobLogger::new(&job.id, "concat");
        let started = Instant::now();

        job.advance(JobStage::Preparing)?;
        logger.log_start(&format!(
            "{} clips -> {}",
            job.clip_count(),
            command.output().display()
        ));
        metrics::record_job_started();
        self.broadcaster
            .publish(ProgressEvent::preparing(&job.id, job.clip_count()))
            .await;

        let mut runner = FfmpegRunner::with_program(&self.ffmpeg);
        if let Some(rx) = cancel_rx {
            runner = runner.with_cancel(rx);
        }

        let spawned = runner.spawn(command.build_args());

        job.advance(JobStage::Processing)?;
        self.broadcaster
            .publish(ProgressEvent::processing(&job.id))
            .await;

        let running = match spawned {
            Ok(running) => running,
            Err(e) => return self.fail(job, &logger, e).await,
        };
        logger.log_progress(&format!(
            "ffmpeg running (pid {})",
            running
                .id()
                .map(|pid| pid.to_string())
                .unwrap_or_else(|| "?".to_string())
        ));

        if let Err(e) = running.wait().await {
            return self.fail(job, &logger, e).await;
        }

        job.advance(JobStage::Complete)?;
        let output_size = match tokio::fs::metadata(command.output()).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                logger.log_warning(&format!(
                    "output {} not readable after success: {}",
                    command.output().display(),
                    e
                ));
                0
            }
        };
        let elapsed = started.elapsed();

        self.broadcaster
            .publish(ProgressEvent::complete(
                &job.id,
                command.output(),
                output_size,
            ))
            .await;
        metrics::record_job_completed(elapsed.as_secs_f64());
        logger.log_completion(&format!(
            "{} bytes in {:.2}s",
            output_size,
            elapsed.as_secs_f64()
        ));

        Ok(CompletedJob {
            job_id: job.id.clone(),
            output_path: command.output().to_path_buf(),
            output_size,
            elapsed,
        })
    }

    /// Publish the error event for `err` and move the job to `Error`.
    async fn fail(
        &self,
        job: &mut Job,
        logger: &JobLogger,
        err: MediaError,
    ) -> WorkerResult<CompletedJob> {
        job.advance(JobStage::Error)?;

        let (kind, message) = match &err {
            MediaError::Cancelled => (JobErrorKind::Cancelled, CANCELLED_MESSAGE.to_string()),
            MediaError::ToolMissing { .. } => (JobErrorKind::ToolMissing, err.to_string()),
            MediaError::FfmpegFailed { message, .. } => (
                JobErrorKind::FfmpegFailed,
                format!("FFmpeg failed: {}", message),
            ),
            other => (JobErrorKind::Other, other.to_string()),
        };

        logger.log_error(&message);
        metrics::record_job_failed(kind.as_str());

        let event = match err.diagnostics() {
            Some(details) => ProgressEvent::error_with_details(&job.id, kind, &message, details),
            None => ProgressEvent::error(&job.id, kind, &message),
        };
        self.broadcaster.publish(event).await;

        Err(WorkerError::Media(err))
    }
}
