//! Join coordination.
//!
//! Accepts concatenation requests, validates and plans them up front, then
//! runs each job on its own task. Jobs are independent; nothing serializes
//! them.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, Instrument};

use splice_media::{FilterGraphBuilder, MetadataExtractor};
use splice_models::{ClipId, ClipMetadata, Job, JobId, ProcessingConfig};

use crate::broadcast::{ObserverId, ProgressBroadcaster, Subscription};
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::executor::{CompletedJob, JobExecutor};
use crate::logging::JobLogger;
use crate::metrics;
use crate::output::output_file_name;

/// A request to join clips in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcatRequest {
    pub clips: Vec<ClipMetadata>,
    #[serde(default)]
    pub output_filename: Option<String>,
    #[serde(default)]
    pub config: ProcessingConfig,
}

impl ConcatRequest {
    pub fn new(clips: Vec<ClipMetadata>) -> Self {
        Self {
            clips,
            output_filename: None,
            config: ProcessingConfig::default(),
        }
    }

    pub fn with_output_filename(mut self, name: impl Into<String>) -> Self {
        self.output_filename = Some(name.into());
        self
    }

    pub fn with_config(mut self, config: ProcessingConfig) -> Self {
        self.config = config;
        self
    }
}

/// Returned once a request has been accepted and its job started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcatAck {
    pub job_id: JobId,
    pub output_filename: String,
    pub output_path: PathBuf,
    pub clip_count: usize,
}

/// Snapshot of coordinator load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorStatus {
    pub active_jobs: usize,
    pub connected_observers: usize,
}

/// Handle to a running job.
///
/// Dropping the handle detaches the job; it still runs to completion.
#[derive(Debug)]
pub struct JobHandle {
    job_id: JobId,
    join: JoinHandle<WorkerResult<CompletedJob>>,
    cancel_tx: watch::Sender<bool>,
}

impl JobHandle {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Ask the job to stop. The FFmpeg process is killed and the job ends
    /// with a "cancelled" error event. No effect once the job has finished.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the job's outcome.
    pub async fn wait(self) -> WorkerResult<CompletedJob> {
        self.join
            .await
            .map_err(|e| WorkerError::JobAborted(e.to_string()))?
    }
}

/// Decrements the active job count when the job task ends, however it ends.
struct ActiveJobGuard(Arc<AtomicUsize>);

impl ActiveJobGuard {
    fn acquire(counter: &Arc<AtomicUsize>) -> Self {
        let active = counter.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::set_active_jobs(active);
        Self(Arc::clone(counter))
    }
}

impl Drop for ActiveJobGuard {
    fn drop(&mut self) {
        let active = self.0.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        metrics::set_active_jobs(active);
    }
}

/// Front door for probing clips and starting join jobs.
pub struct JoinCoordinator {
    config: WorkerConfig,
    broadcaster: Arc<ProgressBroadcaster>,
    extractor: MetadataExtractor,
    executor: JobExecutor,
    active_jobs: Arc<AtomicUsize>,
}

impl JoinCoordinator {
    pub fn new(config: WorkerConfig) -> Self {
        let broadcaster = Arc::new(ProgressBroadcaster::new(config.observer_buffer));
        let extractor = MetadataExtractor::new()
            .with_tools(&config.ffmpeg_bin, &config.ffprobe_bin)
            .with_thumbnail(config.thumbnail_options());
        let executor = JobExecutor::new(&config.ffmpeg_bin, Arc::clone(&broadcaster));

        Self {
            config,
            broadcaster,
            extractor,
            executor,
            active_jobs: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Skip thumbnail capture when probing.
    pub fn without_thumbnails(mut self) -> Self {
        self.extractor = self.extractor.without_thumbnail();
        self
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn broadcaster(&self) -> Arc<ProgressBroadcaster> {
        Arc::clone(&self.broadcaster)
    }

    /// Extract metadata for one file under a fresh clip id.
    pub async fn probe_clip(&self, path: impl AsRef<Path>) -> WorkerResult<ClipMetadata> {
        Ok(self.extractor.extract(ClipId::new(), path).await?)
    }

    pub async fn subscribe(&self) -> Subscription {
        self.broadcaster.subscribe().await
    }

    pub async fn unsubscribe(&self, id: ObserverId) -> bool {
        self.broadcaster.unsubscribe(id).await
    }

    /// Validate `request`, build its FFmpeg invocation and start the job.
    ///
    /// Anything wrong with the request is reported here, before a task is
    /// spawned or an event published.
    pub async fn start_concat(&self, request: ConcatRequest) -> WorkerResult<(ConcatAck, JobHandle)> {
        let ConcatRequest {
            clips,
            output_filename,
            config,
        } = request;

        if clips.is_empty() {
            return Err(WorkerError::invalid_request("no clips to concatenate"));
        }
        let config = config.validated()?;

        let output_filename = output_file_name(output_filename.as_deref(), Utc::now())?;
        let output_path = self.config.output_dir.join(&output_filename);
        let command = FilterGraphBuilder::new(&config).build(&clips, &output_path)?;

        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        let mut job = Job::new(clips, config, &output_path);
        let ack = ConcatAck {
            job_id: job.id.clone(),
            output_filename,
            output_path,
            clip_count: job.clip_count(),
        };
        info!(
            job_id = %ack.job_id,
            clips = ack.clip_count,
            output = %ack.output_path.display(),
            "Accepted concat request"
        );

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let guard = ActiveJobGuard::acquire(&self.active_jobs);
        let executor = self.executor.clone();
        let span = JobLogger::new(&job.id, "concat").create_span();

        let join = tokio::spawn(
            async move {
                let _guard = guard;
                executor.execute(&mut job, &command, Some(cancel_rx)).await
            }
            .instrument(span),
        );

        let handle = JobHandle {
            job_id: ack.job_id.clone(),
            join,
            cancel_tx,
        };
        Ok((ack, handle))
    }

    pub async fn status(&self) -> CoordinatorStatus {
        CoordinatorStatus {
            active_jobs: self.active_jobs.load(Ordering::SeqCst),
            connected_observers: self.broadcaster.observer_count().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splice_models::VideoStreamInfo;

    fn coordinator(dir: &Path) -> JoinCoordinator {
        JoinCoordinator::new(WorkerConfig {
            ffmpeg_bin: PathBuf::from("/nonexistent/ffmpeg"),
            ffprobe_bin: PathBuf::from("/nonexistent/ffprobe"),
            output_dir: dir.join("out"),
            ..WorkerConfig::default()
        })
    }

    fn clip(name: &str) -> ClipMetadata {
        ClipMetadata::new(ClipId::from(name), name)
            .with_video(VideoStreamInfo::new(640, 360, 16.0, 32).unwrap())
    }

    #[tokio::test]
    async fn test_rejects_empty_request_without_events() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator(dir.path());
        let mut sub = coordinator.subscribe().await;

        let err = coordinator
            .start_concat(ConcatRequest::new(Vec::new()))
            .await
            .unwrap_err();
        assert!(err.is_invalid_input());
        assert!(sub.try_recv().is_none());
        assert_eq!(coordinator.status().await.active_jobs, 0);
    }

    #[tokio::test]
    async fn test_rejects_invalid_config_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator(dir.path());

        let bad_rate = ConcatRequest::new(vec![clip("a.mp4")])
            .with_config(ProcessingConfig::default().with_framerate(0.0));
        assert!(coordinator
            .start_concat(bad_rate)
            .await
            .unwrap_err()
            .is_invalid_input());

        let bad_name =
            ConcatRequest::new(vec![clip("a.mp4")]).with_output_filename("../../etc/out");
        assert!(coordinator
            .start_concat(bad_name)
            .await
            .unwrap_err()
            .is_invalid_input());
    }

    #[tokio::test]
    async fn test_ack_describes_job() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator(dir.path());

        let request = ConcatRequest::new(vec![clip("a.mp4"), clip("b.mp4")])
            .with_output_filename("joined");
        let (ack, handle) = coordinator.start_concat(request).await.unwrap();

        assert_eq!(ack.output_filename, "joined.mp4");
        assert_eq!(ack.output_path, dir.path().join("out").join("joined.mp4"));
        assert_eq!(ack.clip_count, 2);
        assert_eq!(handle.job_id(), &ack.job_id);
        assert!(dir.path().join("out").is_dir());

        // The binary does not exist, so the job fails as a missing tool.
        let err = handle.wait().await.unwrap_err();
        assert!(err.is_tool_missing());
        assert_eq!(coordinator.status().await.active_jobs, 0);
    }

    #[test]
    fn test_request_defaults_from_json() {
        let request: ConcatRequest = serde_json::from_str(r#"{"clips": []}"#).unwrap();
        assert!(request.output_filename.is_none());
        assert_eq!(request.config, ProcessingConfig::default());
    }
}
