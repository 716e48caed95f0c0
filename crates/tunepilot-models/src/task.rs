//! Download task types and their lifecycle.
//!
//! A task tracks one download request from chat command to delivered
//! artifact. The status machine is fixed:
//!
//! ```text
//! Queued -> Running -> Uploading -> Done
//! ```
//!
//! with `Cancelled` and `Failed` reachable from every non-terminal state.
//! Terminal states are immutable; late or duplicate terminal signals are
//! discarded by the registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ids::{TaskId, UserId};
use crate::provider::Provider;
use crate::settings::SettingsSnapshot;

/// Status of a download task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for a download slot.
    #[default]
    Queued,
    /// The external downloader is running.
    Running,
    /// The artifact is being delivered to its destination.
    Uploading,
    /// Artifact delivered successfully.
    Done,
    /// The download or delivery failed.
    Failed,
    /// Cancelled by the user.
    Cancelled,
}

impl TaskStatus {
    /// Returns true for states that end the lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Done | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Checks whether the state machine permits a transition.
    ///
    /// Nothing leaves a terminal state. `Cancelled` and `Failed` are
    /// reachable from every non-terminal state; forward progress follows
    /// `Queued -> Running -> Uploading -> Done`, with `Running -> Done`
    /// allowed for deliveries that finalize inline.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, TaskStatus::Cancelled) | (_, TaskStatus::Failed) => true,
            (TaskStatus::Queued, TaskStatus::Running) => true,
            (TaskStatus::Running, TaskStatus::Uploading) => true,
            (TaskStatus::Running, TaskStatus::Done) => true,
            (TaskStatus::Uploading, TaskStatus::Done) => true,
            _ => false,
        }
    }
}

/// Result of a successful download, pending delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadOutcome {
    /// Root of the downloaded artifact (file or directory).
    pub artifact_path: PathBuf,
    /// Number of files produced.
    pub file_count: usize,
}

/// One tracked download request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier.
    pub id: TaskId,

    /// User who requested the download.
    pub owner: UserId,

    /// Source URL as given in the chat command.
    pub url: String,

    /// Provider resolved from the URL.
    pub provider: Provider,

    /// Current lifecycle status.
    pub status: TaskStatus,

    /// Progress percentage, 0-100.
    pub progress: u8,

    /// Free-text stage note from the downloader ("Converting...", etc.).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,

    /// When the request was received.
    pub created_at: DateTime<Utc>,

    /// When the external downloader started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// When the task reached a terminal state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    /// Human-readable cause when the task failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Delivered artifact details when the task completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<DownloadOutcome>,

    /// Provider settings frozen at creation time.
    pub settings: SettingsSnapshot,

    /// Download attempts made so far (for retry bookkeeping).
    #[serde(default)]
    pub attempts: u32,
}

impl Task {
    /// Creates a new queued task.
    pub fn new(
        owner: UserId,
        url: impl Into<String>,
        provider: Provider,
        settings: SettingsSnapshot,
    ) -> Self {
        Self {
            id: TaskId::new(),
            owner,
            url: url.into(),
            provider,
            status: TaskStatus::Queued,
            progress: 0,
            stage: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            error: None,
            outcome: None,
            settings,
            attempts: 0,
        }
    }

    /// Marks the task as running.
    pub fn start(&mut self) {
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Marks the task as uploading.
    pub fn uploading(&mut self) {
        self.status = TaskStatus::Uploading;
        self.progress = 100;
    }

    /// Records a progress update.
    pub fn set_progress(&mut self, percent: u8, note: Option<String>) {
        self.progress = percent.min(100);
        if note.is_some() {
            self.stage = note;
        }
    }

    /// Marks the task as done with the delivered outcome.
    pub fn complete(&mut self, outcome: DownloadOutcome) {
        self.status = TaskStatus::Done;
        self.progress = 100;
        self.finished_at = Some(Utc::now());
        self.outcome = Some(outcome);
    }

    /// Marks the task as failed with a cause.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = TaskStatus::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error.into());
    }

    /// Marks the task as cancelled.
    pub fn cancel(&mut self) {
        self.status = TaskStatus::Cancelled;
        self.finished_at = Some(Utc::now());
    }
}
