//! Artifact delivery.
//!
//! A finished download sits in the task's directory until the uploader
//! moves it to its destination. Delivery never deletes anything before
//! the destination has confirmed: a failed or interrupted delivery
//! leaves the artifact on disk for a retry, a successful one cleans the
//! task directory up.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

use tunepilot_models::{Task, UserId};

use crate::error::{Result, UploadError};

/// Where a finished artifact goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Send each file into the requesting chat.
    Chat,
    /// Copy to an rclone remote, e.g. `gdrive:music`.
    Remote { remote: String },
    /// Copy to a directory on this machine.
    Local { path: PathBuf },
}

/// Seam between the uploader and the chat frontend.
///
/// The bot implements this; tests substitute their own.
#[async_trait]
pub trait ChatDelivery: Send + Sync {
    /// Sends one file to the user's chat.
    async fn send_file(&self, owner: UserId, path: &Path) -> Result<()>;
}

/// What a successful delivery moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub files_delivered: usize,
}

/// Delivers finished artifacts and cleans up after them.
pub struct Uploader {
    chat: Arc<dyn ChatDelivery>,
    rclone_binary: String,
}

impl Uploader {
    /// Creates an uploader sending chat files through `chat`.
    pub fn new(chat: Arc<dyn ChatDelivery>) -> Self {
        Self {
            chat,
            rclone_binary: "rclone".to_string(),
        }
    }

    /// Overrides the rclone binary name.
    pub fn with_rclone_binary(mut self, binary: impl Into<String>) -> Self {
        self.rclone_binary = binary.into();
        self
    }

    /// Delivers a task's artifact to `destination`.
    ///
    /// The artifact directory is removed only after every file reached
    /// the destination; any failure leaves it untouched.
    pub async fn deliver(
        &self,
        task: &Task,
        artifact_path: &Path,
        destination: &Destination,
    ) -> Result<DeliveryReport> {
        let files = collect_files(artifact_path)?;
        if files.is_empty() {
            return Err(UploadError::ArtifactMissing {
                path: artifact_path.to_path_buf(),
            });
        }

        info!(
            task_id = %task.id,
            files = files.len(),
            ?destination,
            "delivering artifact"
        );

        let report = match destination {
            Destination::Chat => self.deliver_to_chat(task.owner, &files).await?,
            Destination::Remote { remote } => {
                self.deliver_to_remote(artifact_path, remote, files.len()).await?
            }
            Destination::Local { path } => deliver_to_local(artifact_path, path, &files)?,
        };

        if let Err(e) = fs::remove_dir_all(artifact_path) {
            warn!(path = %artifact_path.display(), error = %e, "failed to clean up artifact");
        }

        info!(task_id = %task.id, files = report.files_delivered, "artifact delivered");
        Ok(report)
    }

    async fn deliver_to_chat(&self, owner: UserId, files: &[PathBuf]) -> Result<DeliveryReport> {
        for file in files {
            self.chat.send_file(owner, file).await?;
        }
        Ok(DeliveryReport {
            files_delivered: files.len(),
        })
    }

    async fn deliver_to_remote(
        &self,
        artifact_path: &Path,
        remote: &str,
        file_count: usize,
    ) -> Result<DeliveryReport> {
        let binary = which::which(&self.rclone_binary)
            .map_err(|_| UploadError::Destination(format!("{} not installed", self.rclone_binary)))?;

        let output = Command::new(binary)
            .arg("copy")
            .arg(artifact_path)
            .arg(remote)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.lines().rev().take(5).collect::<Vec<_>>().join("; ");
            return Err(UploadError::Destination(format!(
                "rclone copy to {} failed: {}",
                remote,
                if detail.is_empty() {
                    format!("exit status {}", output.status.code().unwrap_or(-1))
                } else {
                    detail
                }
            )));
        }

        Ok(DeliveryReport {
            files_delivered: file_count,
        })
    }
}

fn deliver_to_local(
    artifact_path: &Path,
    target: &Path,
    files: &[PathBuf],
) -> Result<DeliveryReport> {
    for file in files {
        let relative = file
            .strip_prefix(artifact_path)
            .map_err(|_| UploadError::Destination("file escaped artifact directory".to_string()))?;
        let dest = target.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(file, &dest)?;
    }
    Ok(DeliveryReport {
        files_delivered: files.len(),
    })
}

/// Lists deliverable files under `dir`, skipping hidden files and
/// partial downloads. A missing directory is an [`UploadError::ArtifactMissing`].
fn collect_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(UploadError::ArtifactMissing {
            path: dir.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    walk(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if name.starts_with('.') {
            continue;
        }
        if path.is_dir() {
            walk(&path, out)?;
        } else if !name.ends_with(".tmp") && !name.ends_with(".part") {
            out.push(path);
        }
    }
    Ok(())
}
