//! Join job execution.
//!
//! This crate provides:
//! - Progress fan-out to any number of observers
//! - Job execution with stage reporting
//! - Request validation, output naming and job handles
//! - Worker configuration, logging and metrics

pub mod broadcast;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod output;

pub use broadcast::{ObserverId, ProgressBroadcaster, Subscription};
pub use config::WorkerConfig;
pub use coordinator::{ConcatAck, ConcatRequest, CoordinatorStatus, JobHandle, JoinCoordinator};
pub use error::{WorkerError, WorkerResult};
pub use executor::{CompletedJob, JobExecutor, CANCELLED_MESSAGE};
pub use logging::{init_tracing, JobLogger};
pub use output::output_file_name;
