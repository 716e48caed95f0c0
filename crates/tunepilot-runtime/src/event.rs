//! Orchestrator events.
//!
//! Broadcast to every subscriber; the bot turns them into chat
//! notifications.

use tunepilot_models::{Task, TaskId, UserId};

/// Events emitted by the orchestrator.
#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    /// A task was accepted and queued.
    Queued {
        /// The new task.
        task: Task,
    },
    /// A download attempt started.
    Started {
        /// Task ID.
        task_id: TaskId,
        /// Owner of the task.
        owner: UserId,
        /// Attempt number, starting at 1.
        attempt: u32,
    },
    /// Progress was reported by the downloader.
    Progress {
        /// Task ID.
        task_id: TaskId,
        /// Owner of the task.
        owner: UserId,
        /// Percentage, when known.
        percent: Option<u8>,
        /// Stage note, when known.
        stage: Option<String>,
    },
    /// The artifact is being delivered.
    Uploading {
        /// Task ID.
        task_id: TaskId,
        /// Owner of the task.
        owner: UserId,
    },
    /// The task finished successfully.
    Completed {
        /// The finished task.
        task: Task,
    },
    /// The task failed for good.
    Failed {
        /// The failed task.
        task: Task,
        /// Failure cause.
        error: String,
    },
    /// The task was cancelled.
    Cancelled {
        /// Task ID.
        task_id: TaskId,
        /// Owner of the task.
        owner: UserId,
    },
}

impl OrchestratorEvent {
    /// Returns the task ID associated with this event.
    pub fn task_id(&self) -> &TaskId {
        match self {
            OrchestratorEvent::Queued { task } => &task.id,
            OrchestratorEvent::Started { task_id, .. } => task_id,
            OrchestratorEvent::Progress { task_id, .. } => task_id,
            OrchestratorEvent::Uploading { task_id, .. } => task_id,
            OrchestratorEvent::Completed { task } => &task.id,
            OrchestratorEvent::Failed { task, .. } => &task.id,
            OrchestratorEvent::Cancelled { task_id, .. } => task_id,
        }
    }

    /// Returns the owner the event concerns.
    pub fn owner(&self) -> UserId {
        match self {
            OrchestratorEvent::Queued { task } => task.owner,
            OrchestratorEvent::Started { owner, .. } => *owner,
            OrchestratorEvent::Progress { owner, .. } => *owner,
            OrchestratorEvent::Uploading { owner, .. } => *owner,
            OrchestratorEvent::Completed { task } => task.owner,
            OrchestratorEvent::Failed { task, .. } => task.owner,
            OrchestratorEvent::Cancelled { owner, .. } => *owner,
        }
    }

    /// Returns true if this event ends the task's lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrchestratorEvent::Completed { .. }
                | OrchestratorEvent::Failed { .. }
                | OrchestratorEvent::Cancelled { .. }
        )
    }
}
