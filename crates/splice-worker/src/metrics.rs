//! Job metrics.
//!
//! Recorded through the `metrics` facade; the embedding process decides
//! whether and how to export them.

use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_STARTED_TOTAL: &str = "splice_jobs_started_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "splice_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "splice_jobs_failed_total";
    pub const JOBS_ACTIVE: &str = "splice_jobs_active";
    pub const FFMPEG_DURATION_SECONDS: &str = "splice_ffmpeg_duration_seconds";
    pub const OBSERVERS_DROPPED_TOTAL: &str = "splice_observers_dropped_total";
}

pub fn record_job_started() {
    counter!(names::JOBS_STARTED_TOTAL).increment(1);
}

pub fn record_job_completed(duration_secs: f64) {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
    histogram!(names::FFMPEG_DURATION_SECONDS).record(duration_secs);
}

/// `reason` is a short label such as `tool_missing`, `ffmpeg_failed` or `cancelled`.
pub fn record_job_failed(reason: &'static str) {
    counter!(names::JOBS_FAILED_TOTAL, "reason" => reason).increment(1);
}

pub fn set_active_jobs(count: usize) {
    gauge!(names::JOBS_ACTIVE).set(count as f64);
}

pub fn record_observers_dropped(count: usize) {
    counter!(names::OBSERVERS_DROPPED_TOTAL).increment(count as u64);
}
