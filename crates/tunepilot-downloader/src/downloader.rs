//! External downloader execution.
//!
//! One [`Downloader::run`] call covers a single download attempt: spawn
//! the provider's tool, stream its stdout through the progress parser,
//! keep a tail of stderr for diagnosis, and wait for exit, cancellation
//! or timeout, whichever comes first. Cancellation and timeout both
//! kill the process group before returning.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use tunepilot_models::{DownloadOutcome, Task, TaskId};

use crate::command::DownloaderRegistry;
use crate::error::{DownloadError, Result};
use crate::patterns::{classify_error, parse_progress, ErrorClass, ProgressUpdate};

/// How many stderr lines to keep for the failure message.
const STDERR_TAIL: usize = 20;

/// Default download location when the snapshot lacks one.
const DEFAULT_BASE_PATH: &str = "~/download";

/// Default per-attempt time limit in seconds.
const DEFAULT_TIMEOUT_SECS: i64 = 300;

/// Runs provider downloaders as child processes.
pub struct Downloader {
    registry: DownloaderRegistry,
}

impl Downloader {
    /// Creates a downloader with the given tool registry.
    pub fn new(registry: DownloaderRegistry) -> Self {
        Self { registry }
    }

    /// The directory a task's artifacts land in, derived from the
    /// task's frozen settings.
    pub fn task_dir(&self, task: &Task) -> PathBuf {
        let base = task.settings.str_or("download_base_path", DEFAULT_BASE_PATH);
        let expanded = shellexpand::tilde(base);
        Path::new(expanded.as_ref()).join("tasks").join(task.id.as_str())
    }

    /// Runs one download attempt for the task.
    ///
    /// Progress updates are pushed to `progress` as they are parsed; a
    /// closed receiver just drops them. Flipping `cancel` to true kills
    /// the child and yields [`DownloadError::Cancelled`].
    pub async fn run(
        &self,
        task: &Task,
        progress: mpsc::Sender<ProgressUpdate>,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<DownloadOutcome> {
        if *cancel.borrow() {
            return Err(DownloadError::Cancelled);
        }

        let dest = self.task_dir(task);
        fs::create_dir_all(&dest)?;

        let spec = self.registry.spec(task.provider);
        let (binary, args) = spec.build(&task.url, &dest)?;
        info!(
            task_id = %task.id,
            binary = %binary.display(),
            provider = %task.provider,
            "spawning downloader"
        );

        let mut child = Command::new(&binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::Fatal("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::Fatal("stderr not captured".to_string()))?;

        let task_id = task.id.clone();
        let stdout_reader = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(update) = parse_progress(&line) {
                    debug!(task_id = %task_id, ?update, "progress");
                    let _ = progress.send(update).await;
                }
            }
        });

        let stderr_reader = tokio::spawn(async move {
            let mut tail = Vec::new();
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if !line.trim().is_empty() {
                    tail.push(line);
                    if tail.len() > STDERR_TAIL {
                        tail.remove(0);
                    }
                }
            }
            tail
        });

        let timeout_secs = task
            .settings
            .int_or("timeout_seconds", DEFAULT_TIMEOUT_SECS)
            .max(1) as u64;

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = cancelled(&mut cancel) => {
                warn!(task_id = %task.id, "cancel requested, killing downloader");
                kill(&mut child).await;
                stdout_reader.abort();
                stderr_reader.abort();
                return Err(DownloadError::Cancelled);
            }
            _ = tokio::time::sleep(Duration::from_secs(timeout_secs)) => {
                warn!(task_id = %task.id, timeout_secs, "downloader timed out, killing it");
                kill(&mut child).await;
                stdout_reader.abort();
                stderr_reader.abort();
                return Err(DownloadError::TimedOut(timeout_secs));
            }
        };

        let _ = stdout_reader.await;
        let stderr_tail = stderr_reader.await.unwrap_or_default();

        if !status.success() {
            let detail = if stderr_tail.is_empty() {
                format!("exit status {}", status.code().unwrap_or(-1))
            } else {
                stderr_tail.join("\n")
            };
            return Err(match classify_error(&detail) {
                ErrorClass::Transient => DownloadError::Transient(detail),
                ErrorClass::Fatal => DownloadError::Fatal(detail),
            });
        }

        let file_count = count_artifacts(&dest)?;
        if file_count == 0 {
            return Err(DownloadError::Fatal("no files downloaded".to_string()));
        }

        info!(task_id = %task.id, file_count, path = %dest.display(), "download finished");
        Ok(DownloadOutcome {
            artifact_path: dest,
            file_count,
        })
    }

    /// Removes a task's download directory, for cleanup after delivery
    /// or cancellation.
    pub fn remove_task_dir(&self, task: &Task) -> std::io::Result<()> {
        let dir = self.task_dir(task);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Same cleanup, addressed by ID when the task itself is gone.
    pub fn remove_dir_for(&self, base: &Path, id: &TaskId) -> std::io::Result<()> {
        let dir = base.join("tasks").join(id.as_str());
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }
}

/// Resolves once the watch flag turns true. Never resolves if the
/// sender is dropped, so a vanished controller can't cancel a download.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn kill(child: &mut tokio::process::Child) {
    if let Err(e) = child.start_kill() {
        warn!(error = %e, "failed to kill downloader process");
    }
    let _ = child.wait().await;
}

/// Counts delivered files under `dir`, skipping hidden files and
/// partial downloads.
pub(crate) fn count_artifacts(dir: &Path) -> Result<usize> {
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if name.starts_with('.') {
            continue;
        }
        if path.is_dir() {
            count += count_artifacts(&path)?;
        } else if !name.ends_with(".tmp") && !name.ends_with(".part") {
            count += 1;
        }
    }
    Ok(count)
}
