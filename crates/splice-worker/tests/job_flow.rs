//! End-to-end job flow against a stand-in FFmpeg script.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::timeout;

use splice_models::{
    ClipId, ClipMetadata, JobErrorKind, JobId, JobStage, ProcessingConfig, ProgressEvent,
    VideoStreamInfo,
};
use splice_worker::{
    ConcatRequest, JoinCoordinator, Subscription, WorkerConfig, CANCELLED_MESSAGE,
};

const WAIT: Duration = Duration::from_secs(20);

/// Writes its arguments, one per line, to the output path (the last argument).
const ECHO_ARGS: &str = r#"#!/bin/sh
for last; do :; done
printf '%s\n' "$@" > "$last"
"#;

const FAILING: &str = r#"#!/bin/sh
echo "Error initializing complex filters: Invalid argument" >&2
exit 1
"#;

const HANGING: &str = r#"#!/bin/sh
exec sleep 30
"#;

fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn coordinator(dir: &TempDir, ffmpeg: PathBuf) -> JoinCoordinator {
    JoinCoordinator::new(WorkerConfig {
        ffmpeg_bin: ffmpeg,
        ffprobe_bin: PathBuf::from("/nonexistent/ffprobe"),
        output_dir: dir.path().join("output"),
        ..WorkerConfig::default()
    })
}

fn clip(name: &str, has_audio: bool) -> ClipMetadata {
    ClipMetadata::new(ClipId::from(name), name)
        .with_video(VideoStreamInfo::new(1280, 720, 16.0, 48).unwrap())
        .with_audio(has_audio)
}

/// Collect events for `job_id` up to and including its terminal event.
async fn events_for(sub: &mut Subscription, job_id: &JobId) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    loop {
        let event = timeout(WAIT, sub.recv())
            .await
            .expect("timed out waiting for progress")
            .expect("broadcaster closed");
        if &event.job_id != job_id {
            continue;
        }
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            return events;
        }
    }
}

fn stages(events: &[ProgressEvent]) -> Vec<JobStage> {
    events.iter().map(|e| e.stage).collect()
}

#[tokio::test]
async fn test_successful_job_reports_every_stage() {
    let dir = tempfile::tempdir().unwrap();
    let ffmpeg = fake_tool(dir.path(), "ffmpeg", ECHO_ARGS);
    let coordinator = coordinator(&dir, ffmpeg);
    let mut sub = coordinator.subscribe().await;

    let request = ConcatRequest::new(vec![clip("a.mp4", true), clip("b.mp4", false)])
        .with_output_filename("joined");
    let (ack, handle) = coordinator.start_concat(request).await.unwrap();

    let events = events_for(&mut sub, &ack.job_id).await;
    assert_eq!(
        stages(&events),
        vec![JobStage::Preparing, JobStage::Processing, JobStage::Complete]
    );
    assert_eq!(events[0].message, "Starting concatenation of 2 clips");
    assert_eq!(
        events.iter().map(|e| e.progress).collect::<Vec<_>>(),
        vec![0, 10, 100]
    );

    let completed = handle.wait().await.unwrap();
    let written = std::fs::read_to_string(&ack.output_path).unwrap();

    let complete = &events[2];
    assert_eq!(complete.output_filename.as_deref(), Some("joined.mp4"));
    assert_eq!(complete.output_path.as_deref(), Some(ack.output_path.as_path()));
    assert_eq!(complete.output_size, Some(written.len() as u64));
    assert_eq!(completed.output_size, written.len() as u64);

    // Audio follows the first clip, so both streams are concatenated.
    assert!(written.contains("-filter_complex"));
    assert!(written.contains("concat=n=2:v=1:a=1[outv][outa]"));
    assert!(written.contains("[1:v]trim=start=0.0625,setpts=PTS-STARTPTS[v1]"));
}

#[tokio::test]
async fn test_failed_run_carries_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let ffmpeg = fake_tool(dir.path(), "ffmpeg", FAILING);
    let coordinator = coordinator(&dir, ffmpeg);
    let mut sub = coordinator.subscribe().await;

    let (ack, handle) = coordinator
        .start_concat(ConcatRequest::new(vec![clip("a.mp4", true), clip("b.mp4", true)]))
        .await
        .unwrap();

    let events = events_for(&mut sub, &ack.job_id).await;
    assert_eq!(
        stages(&events),
        vec![JobStage::Preparing, JobStage::Processing, JobStage::Error]
    );
    let error = &events[2];
    assert_eq!(error.progress, 0);
    assert_eq!(error.error_kind, Some(JobErrorKind::FfmpegFailed));
    assert!(error
        .details
        .as_deref()
        .unwrap()
        .contains("Invalid argument"));

    let err = handle.wait().await.unwrap_err();
    assert!(!err.is_tool_missing());
}

#[tokio::test]
async fn test_missing_tool_is_labeled_distinctly() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = coordinator(&dir, dir.path().join("no-such-ffmpeg"));
    let mut sub = coordinator.subscribe().await;

    let (ack, handle) = coordinator
        .start_concat(ConcatRequest::new(vec![clip("a.mp4", true)]))
        .await
        .unwrap();

    let events = events_for(&mut sub, &ack.job_id).await;
    assert_eq!(
        stages(&events),
        vec![JobStage::Preparing, JobStage::Processing, JobStage::Error]
    );
    assert_eq!(
        events.iter().map(|e| e.progress).collect::<Vec<_>>(),
        vec![0, 10, 0]
    );
    assert!(events[2].message.contains("not found"));
    assert_eq!(events[2].error_kind, Some(JobErrorKind::ToolMissing));
    assert!(handle.wait().await.unwrap_err().is_tool_missing());
}

#[tokio::test]
async fn test_missing_tool_and_failed_run_differ_in_kind() {
    let dir = tempfile::tempdir().unwrap();
    let failing = fake_tool(dir.path(), "ffmpeg", FAILING);

    let mut kinds = Vec::new();
    for ffmpeg in [dir.path().join("no-such-ffmpeg"), failing] {
        let coordinator = coordinator(&dir, ffmpeg);
        let mut sub = coordinator.subscribe().await;
        let (ack, handle) = coordinator
            .start_concat(ConcatRequest::new(vec![clip("a.mp4", true), clip("b.mp4", true)]))
            .await
            .unwrap();

        let events = events_for(&mut sub, &ack.job_id).await;
        assert_eq!(
            stages(&events),
            vec![JobStage::Preparing, JobStage::Processing, JobStage::Error]
        );
        kinds.push(events[2].error_kind);
        assert!(handle.wait().await.is_err());
    }

    assert_eq!(
        kinds,
        vec![Some(JobErrorKind::ToolMissing), Some(JobErrorKind::FfmpegFailed)]
    );
}

#[tokio::test]
async fn test_cancel_kills_running_job() {
    let dir = tempfile::tempdir().unwrap();
    let ffmpeg = fake_tool(dir.path(), "ffmpeg", HANGING);
    let coordinator = coordinator(&dir, ffmpeg);
    let mut sub = coordinator.subscribe().await;

    let (ack, handle) = coordinator
        .start_concat(ConcatRequest::new(vec![clip("a.mp4", true), clip("b.mp4", true)]))
        .await
        .unwrap();

    // Wait until the process is up before cancelling.
    loop {
        let event = timeout(WAIT, sub.recv()).await.unwrap().unwrap();
        if event.stage == JobStage::Processing {
            break;
        }
    }
    handle.cancel();

    let error = timeout(WAIT, sub.recv()).await.unwrap().unwrap();
    assert_eq!(error.stage, JobStage::Error);
    assert_eq!(error.message, CANCELLED_MESSAGE);
    assert_eq!(error.error_kind, Some(JobErrorKind::Cancelled));
    assert_eq!(error.job_id, ack.job_id);

    assert!(timeout(WAIT, handle.wait()).await.unwrap().is_err());
    assert_eq!(coordinator.status().await.active_jobs, 0);
}

#[tokio::test]
async fn test_concurrent_jobs_keep_their_own_order() {
    let dir = tempfile::tempdir().unwrap();
    let ffmpeg = fake_tool(dir.path(), "ffmpeg", ECHO_ARGS);
    let coordinator = coordinator(&dir, ffmpeg);
    let mut sub = coordinator.subscribe().await;

    let mut jobs = Vec::new();
    for n in 0..4 {
        let request = ConcatRequest::new(vec![clip("a.mp4", true), clip("b.mp4", true)])
            .with_output_filename(format!("job-{}", n))
            .with_config(ProcessingConfig::default().with_trims(1, 1));
        jobs.push(coordinator.start_concat(request).await.unwrap());
    }

    let mut seen: Vec<Vec<JobStage>> = vec![Vec::new(); jobs.len()];
    let mut finished = 0;
    while finished < jobs.len() {
        let event = timeout(WAIT, sub.recv()).await.unwrap().unwrap();
        let index = jobs
            .iter()
            .position(|(ack, _)| ack.job_id == event.job_id)
            .unwrap();
        if event.is_terminal() {
            finished += 1;
        }
        seen[index].push(event.stage);
    }

    for stages in &seen {
        assert_eq!(
            stages,
            &vec![JobStage::Preparing, JobStage::Processing, JobStage::Complete]
        );
    }
    for (ack, handle) in jobs {
        let completed = handle.wait().await.unwrap();
        assert_eq!(completed.output_path, ack.output_path);
        assert!(ack.output_path.exists());
    }
    assert_eq!(coordinator.status().await.active_jobs, 0);
}

#[tokio::test]
async fn test_status_counts_observers() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = coordinator(&dir, PathBuf::from("ffmpeg"));

    let first = coordinator.subscribe().await;
    let _second = coordinator.subscribe().await;
    assert_eq!(coordinator.status().await.connected_observers, 2);

    assert!(coordinator.unsubscribe(first.id()).await);
    let status = coordinator.status().await;
    assert_eq!(status.connected_observers, 1);
    assert_eq!(status.active_jobs, 0);
}
