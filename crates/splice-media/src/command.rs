//! FFmpeg process runner.

use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

/// Default FFmpeg binary name.
pub const FFMPEG: &str = "ffmpeg";
/// Default FFprobe binary name.
pub const FFPROBE: &str = "ffprobe";

/// Bytes of stderr kept for diagnostics; earlier output is discarded.
const STDERR_TAIL_BYTES: usize = 64 * 1024;

/// Runner for FFmpeg commands with optional cancellation.
///
/// Without a cancel receiver the process always runs to completion.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    /// Binary to execute
    program: PathBuf,
    /// Cancellation signal receiver
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    /// Create a runner for `ffmpeg` on PATH.
    pub fn new() -> Self {
        Self::with_program(FFMPEG)
    }

    /// Create a runner for a specific binary.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            cancel_rx: None,
        }
    }

    /// Set cancellation signal.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Spawn the process. A missing binary surfaces as `ToolMissing`.
    pub fn spawn<I, S>(&self, args: I) -> MediaResult<RunningFfmpeg>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        debug!(
            "Running FFmpeg: {} {}",
            self.program.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(&self.program, e))?;

        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut stderr) = stderr {
                let mut chunk = [0u8; 8192];
                loop {
                    match stderr.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            buf.extend_from_slice(&chunk[..n]);
                            if buf.len() > STDERR_TAIL_BYTES {
                                let excess = buf.len() - STDERR_TAIL_BYTES;
                                buf.drain(..excess);
                            }
                        }
                    }
                }
            }
            String::from_utf8_lossy(&buf).to_string()
        });

        Ok(RunningFfmpeg {
            child,
            stderr_task,
            cancel_rx: self.cancel_rx.clone(),
        })
    }

    /// Spawn and wait for completion.
    pub async fn run<I, S>(&self, args: I) -> MediaResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.spawn(args)?.wait().await
    }
}

/// A spawned FFmpeg process. Dropping it kills the process.
pub struct RunningFfmpeg {
    child: Child,
    stderr_task: JoinHandle<String>,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl RunningFfmpeg {
    /// OS process id, if the process is still known to the OS.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait for exit. Non-zero exit becomes `FfmpegFailed` carrying the stderr tail.
    pub async fn wait(mut self) -> MediaResult<()> {
        let cancel_rx = self.cancel_rx.take();

        let status: Option<std::io::Result<ExitStatus>> = tokio::select! {
            status = self.child.wait() => Some(status),
            _ = cancelled(cancel_rx) => None,
        };

        let status = match status {
            Some(status) => status?,
            None => {
                info!("FFmpeg cancelled, killing process");
                let _ = self.child.kill().await;
                self.stderr_task.abort();
                return Err(MediaError::Cancelled);
            }
        };

        let stderr = self.stderr_task.await.unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                format!("FFmpeg exited with {}", describe_status(&status)),
                Some(stderr),
                status.code(),
            ))
        }
    }
}

/// Resolves once the flag flips to `true`; never resolves without a receiver
/// or after the sender is dropped.
async fn cancelled(cancel_rx: Option<watch::Receiver<bool>>) {
    let Some(mut rx) = cancel_rx else {
        return std::future::pending().await;
    };
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}

fn describe_status(status: &ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// Map a spawn failure, singling out the missing-binary case.
pub(crate) fn spawn_error(program: &Path, err: std::io::Error) -> MediaError {
    if err.kind() == ErrorKind::NotFound {
        MediaError::tool_missing(program.display().to_string())
    } else {
        MediaError::Io(err)
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    check_tool(FFMPEG)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    check_tool(FFPROBE)
}

/// Resolve a binary name or path to an executable.
pub fn check_tool(program: impl AsRef<OsStr>) -> MediaResult<PathBuf> {
    let program = program.as_ref();
    which::which(program).map_err(|_| MediaError::tool_missing(program.to_string_lossy()))
}
