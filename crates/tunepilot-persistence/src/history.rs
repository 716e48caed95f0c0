//! Download history store.
//!
//! Finished tasks are archived as individual JSON files organized by
//! owner:
//!
//! ```text
//! base_path/
//! └── history/
//!     └── {user_id}/
//!         ├── task-abc123.json
//!         └── task-def456.json
//! ```

use std::fs;
use std::path::PathBuf;

use tracing::warn;

use tunepilot_models::{Task, TaskId, UserId};

use crate::atomic::{atomic_write_json, read_json};
use crate::error::{PersistenceError, Result};

/// Archives terminal tasks so `/history` can show past downloads.
pub struct HistoryStore {
    base_path: PathBuf,
}

impl HistoryStore {
    /// Creates a store rooted at `base_path`.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn user_dir(&self, owner: UserId) -> PathBuf {
        self.base_path.join("history").join(owner.to_string())
    }

    fn task_path(&self, owner: UserId, id: &TaskId) -> PathBuf {
        self.user_dir(owner).join(format!("{}.json", id))
    }

    /// Archives a task. Overwrites any previous record with the same ID.
    pub fn record(&self, task: &Task) -> Result<()> {
        let path = self.task_path(task.owner, &task.id);
        atomic_write_json(&path, task)
    }

    /// Loads a single archived task.
    pub fn load(&self, owner: UserId, id: &TaskId) -> Result<Task> {
        let path = self.task_path(owner, id);
        if !path.exists() {
            return Err(PersistenceError::NotFound {
                kind: "task",
                id: id.to_string(),
            });
        }
        read_json(&path)
    }

    /// Lists a user's archived tasks, most recent first.
    ///
    /// Unreadable records are skipped with a warning rather than failing
    /// the whole listing.
    pub fn list_for(&self, owner: UserId) -> Result<Vec<Task>> {
        let dir = self.user_dir(owner);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&dir).map_err(|source| PersistenceError::Read {
            path: dir.clone(),
            source,
        })?;

        let mut tasks = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| PersistenceError::Read {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match read_json::<Task>(&path) {
                    Ok(task) => tasks.push(task),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping unreadable history record");
                    }
                }
            }
        }

        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    /// Removes archived records beyond the newest `keep` for a user.
    pub fn prune(&self, owner: UserId, keep: usize) -> Result<usize> {
        let tasks = self.list_for(owner)?;
        let mut removed = 0;
        for task in tasks.iter().skip(keep) {
            let path = self.task_path(owner, &task.id);
            if let Err(e) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "failed to prune history record");
            } else {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
