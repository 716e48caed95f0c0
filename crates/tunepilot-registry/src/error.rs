//! Error types for registry operations.

use thiserror::Error;
use tunepilot_models::{TaskId, TaskStatus};
use tunepilot_persistence::PersistenceError;

/// Errors that can occur during registry operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The owner already has an unfinished task for the same URL.
    #[error("a download for this URL is already in progress: {url}")]
    DuplicateActiveRequest { url: String },

    /// The requested status change violates the lifecycle.
    #[error("invalid transition: {from:?} -> {to:?}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    /// No task with that ID is tracked.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// Persistence error while archiving.
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Lock poisoned (thread panicked while holding lock).
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
