//! The task registry.
//!
//! Tracks every download task from request to terminal state, enforces
//! the lifecycle transition table and archives finished tasks to the
//! history store. The in-memory map is the source of truth while a task
//! is live; history holds it afterwards.
//!
//! Terminal states are immutable: a second terminal signal for the same
//! task (cancel racing completion, a late failure after cancellation) is
//! discarded and the call reports the status that actually stuck.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, info, warn};

use tunepilot_models::{
    DownloadOutcome, Provider, SettingsSnapshot, Task, TaskId, TaskStatus, UserId,
};
use tunepilot_persistence::HistoryStore;

use crate::error::{RegistryError, Result};

/// How many archived tasks to keep per user.
const DEFAULT_HISTORY_KEEP: usize = 50;

/// Tracks live download tasks and archives finished ones.
pub struct TaskRegistry {
    tasks: Mutex<HashMap<TaskId, Task>>,
    history: HistoryStore,
    history_keep: usize,
}

impl TaskRegistry {
    /// Creates a registry archiving to the given history store.
    pub fn new(history: HistoryStore) -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            history,
            history_keep: DEFAULT_HISTORY_KEEP,
        }
    }

    /// Overrides how many archived tasks are kept per user.
    pub fn with_history_keep(mut self, keep: usize) -> Self {
        self.history_keep = keep;
        self
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<TaskId, Task>>> {
        self.tasks
            .lock()
            .map_err(|e| RegistryError::LockPoisoned(e.to_string()))
    }

    /// Registers a new queued task.
    ///
    /// Rejects the request when the owner already has an unfinished task
    /// for the same URL, so a double-tapped command doesn't download
    /// twice.
    pub fn create(
        &self,
        owner: UserId,
        url: impl Into<String>,
        provider: Provider,
        settings: SettingsSnapshot,
    ) -> Result<Task> {
        let url = url.into();
        let mut tasks = self.lock()?;

        let duplicate = tasks
            .values()
            .any(|t| t.owner == owner && t.url == url && !t.status.is_terminal());
        if duplicate {
            return Err(RegistryError::DuplicateActiveRequest { url });
        }

        let task = Task::new(owner, url, provider, settings);
        info!(task_id = %task.id, owner = %owner, provider = %task.provider, "task created");
        tasks.insert(task.id.clone(), task.clone());
        Ok(task)
    }

    /// Returns a copy of a tracked task.
    pub fn get(&self, id: &TaskId) -> Result<Task> {
        let tasks = self.lock()?;
        tasks
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    /// All non-terminal tasks, oldest first.
    pub fn list_active(&self) -> Result<Vec<Task>> {
        let tasks = self.lock()?;
        let mut active: Vec<Task> = tasks
            .values()
            .filter(|t| !t.status.is_terminal())
            .cloned()
            .collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(active)
    }

    /// All tracked tasks for one user, oldest first.
    pub fn list_for(&self, owner: UserId) -> Result<Vec<Task>> {
        let tasks = self.lock()?;
        let mut out: Vec<Task> = tasks
            .values()
            .filter(|t| t.owner == owner)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    /// Number of unfinished tasks a user currently has.
    pub fn active_count_for(&self, owner: UserId) -> Result<usize> {
        let tasks = self.lock()?;
        Ok(tasks
            .values()
            .filter(|t| t.owner == owner && !t.status.is_terminal())
            .count())
    }

    /// Moves a task to `Running`.
    pub fn mark_running(&self, id: &TaskId) -> Result<()> {
        let mut tasks = self.lock()?;
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;

        check_transition(task.status, TaskStatus::Running)?;
        task.start();
        debug!(task_id = %id, "task running");
        Ok(())
    }

    /// Moves a task to `Uploading`.
    pub fn mark_uploading(&self, id: &TaskId) -> Result<()> {
        let mut tasks = self.lock()?;
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;

        check_transition(task.status, TaskStatus::Uploading)?;
        task.uploading();
        debug!(task_id = %id, "task uploading");
        Ok(())
    }

    /// Records a progress update. Valid only while the task is `Running`
    /// or `Uploading`; any other state rejects the update, so a straggling
    /// progress line from a dead process can't resurrect stale state.
    pub fn update_progress(&self, id: &TaskId, percent: u8, note: Option<String>) -> Result<()> {
        let mut tasks = self.lock()?;
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;

        match task.status {
            TaskStatus::Running | TaskStatus::Uploading => {
                task.set_progress(percent, note);
                Ok(())
            }
            status => Err(RegistryError::InvalidTransition {
                from: status,
                to: status,
            }),
        }
    }

    /// Bumps the attempt counter, returning the new count.
    pub fn bump_attempts(&self, id: &TaskId) -> Result<u32> {
        let mut tasks = self.lock()?;
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        task.attempts += 1;
        Ok(task.attempts)
    }

    /// Finalizes a task as `Done`, archiving it. A late completion for
    /// an already-terminal task is discarded; the status that stuck is
    /// returned either way.
    pub fn complete(&self, id: &TaskId, outcome: DownloadOutcome) -> Result<TaskStatus> {
        self.finalize(id, |task| {
            task.complete(outcome.clone());
            info!(task_id = %id, files = outcome.file_count, "task done");
        })
    }

    /// Finalizes a task as `Failed` with a cause.
    pub fn fail(&self, id: &TaskId, error: impl Into<String>) -> Result<TaskStatus> {
        let error = error.into();
        self.finalize(id, |task| {
            warn!(task_id = %id, error = %error, "task failed");
            task.fail(error.clone());
        })
    }

    /// Cancels a task, returning the status it had beforehand so the
    /// caller knows whether a process needs to be killed. Cancelling an
    /// already-terminal task is a no-op that reports its current status.
    pub fn cancel(&self, id: &TaskId) -> Result<TaskStatus> {
        let archived = {
            let mut tasks = self.lock()?;
            let task = tasks
                .get_mut(id)
                .ok_or_else(|| RegistryError::NotFound(id.clone()))?;

            let prior = task.status;
            if prior.is_terminal() {
                debug!(task_id = %id, status = ?prior, "cancel ignored, task already finished");
                return Ok(prior);
            }

            task.cancel();
            info!(task_id = %id, was = ?prior, "task cancelled");
            (task.clone(), prior)
        };

        let (task, prior) = archived;
        self.archive(&task)?;
        Ok(prior)
    }

    /// Removes terminal tasks from the live map, returning how many were
    /// dropped. Archived copies remain in history.
    pub fn prune_finished(&self) -> Result<usize> {
        let mut tasks = self.lock()?;
        let before = tasks.len();
        tasks.retain(|_, t| !t.status.is_terminal());
        Ok(before - tasks.len())
    }

    fn finalize(&self, id: &TaskId, apply: impl FnOnce(&mut Task)) -> Result<TaskStatus> {
        let task = {
            let mut tasks = self.lock()?;
            let task = tasks
                .get_mut(id)
                .ok_or_else(|| RegistryError::NotFound(id.clone()))?;

            if task.status.is_terminal() {
                debug!(task_id = %id, status = ?task.status, "terminal signal discarded");
                return Ok(task.status);
            }

            apply(task);
            task.clone()
        };

        // Archive outside the lock; disk IO shouldn't block other tasks.
        self.archive(&task)?;
        Ok(task.status)
    }

    fn archive(&self, task: &Task) -> Result<()> {
        self.history.record(task)?;
        if let Err(e) = self.history.prune(task.owner, self.history_keep) {
            warn!(owner = %task.owner, error = %e, "history prune failed");
        }
        Ok(())
    }
}

fn check_transition(from: TaskStatus, to: TaskStatus) -> Result<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(RegistryError::InvalidTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn registry(dir: &std::path::Path) -> TaskRegistry {
        TaskRegistry::new(HistoryStore::new(dir))
    }

    fn outcome() -> DownloadOutcome {
        DownloadOutcome {
            artifact_path: PathBuf::from("/tmp/album"),
            file_count: 10,
        }
    }

    #[test]
    fn test_create_and_get() {
        let dir = tempdir().unwrap();
        let reg = registry(dir.path());

        let task = reg
            .create(
                UserId(1),
                "https://tidal.com/album/1",
                Provider::Tidal,
                SettingsSnapshot::default(),
            )
            .unwrap();

        let fetched = reg.get(&task.id).unwrap();
        assert_eq!(fetched.status, TaskStatus::Queued);
        assert_eq!(fetched.owner, UserId(1));
    }

    #[test]
    fn test_duplicate_active_request() {
        let dir = tempdir().unwrap();
        let reg = registry(dir.path());
        let url = "https://tidal.com/album/1";

        reg.create(UserId(1), url, Provider::Tidal, SettingsSnapshot::default())
            .unwrap();
        let err = reg
            .create(UserId(1), url, Provider::Tidal, SettingsSnapshot::default())
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateActiveRequest { .. }));

        // A different user may request the same URL.
        assert!(reg
            .create(UserId(2), url, Provider::Tidal, SettingsSnapshot::default())
            .is_ok());
    }

    #[test]
    fn test_resubmit_after_terminal() {
        let dir = tempdir().unwrap();
        let reg = registry(dir.path());
        let url = "https://tidal.com/album/1";

        let task = reg
            .create(UserId(1), url, Provider::Tidal, SettingsSnapshot::default())
            .unwrap();
        reg.cancel(&task.id).unwrap();

        assert!(reg
            .create(UserId(1), url, Provider::Tidal, SettingsSnapshot::default())
            .is_ok());
    }

    #[test]
    fn test_full_lifecycle() {
        let dir = tempdir().unwrap();
        let reg = registry(dir.path());

        let task = reg
            .create(
                UserId(1),
                "https://tidal.com/album/1",
                Provider::Tidal,
                SettingsSnapshot::default(),
            )
            .unwrap();

        reg.mark_running(&task.id).unwrap();
        reg.update_progress(&task.id, 40, Some("Downloading...".to_string()))
            .unwrap();
        reg.mark_uploading(&task.id).unwrap();
        let status = reg.complete(&task.id, outcome()).unwrap();

        assert_eq!(status, TaskStatus::Done);
        let done = reg.get(&task.id).unwrap();
        assert_eq!(done.progress, 100);
        assert!(done.finished_at.is_some());
    }

    #[test]
    fn test_invalid_transition() {
        let dir = tempdir().unwrap();
        let reg = registry(dir.path());

        let task = reg
            .create(
                UserId(1),
                "https://tidal.com/album/1",
                Provider::Tidal,
                SettingsSnapshot::default(),
            )
            .unwrap();

        // Queued -> Uploading skips Running.
        let err = reg.mark_uploading(&task.id).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidTransition { .. }));
    }

    #[test]
    fn test_cancel_returns_prior_status() {
        let dir = tempdir().unwrap();
        let reg = registry(dir.path());

        let task = reg
            .create(
                UserId(1),
                "https://tidal.com/album/1",
                Provider::Tidal,
                SettingsSnapshot::default(),
            )
            .unwrap();
        reg.mark_running(&task.id).unwrap();

        assert_eq!(reg.cancel(&task.id).unwrap(), TaskStatus::Running);
        assert_eq!(reg.get(&task.id).unwrap().status, TaskStatus::Cancelled);
    }

    #[test]
    fn test_late_terminal_signals_discarded() {
        let dir = tempdir().unwrap();
        let reg = registry(dir.path());

        let task = reg
            .create(
                UserId(1),
                "https://tidal.com/album/1",
                Provider::Tidal,
                SettingsSnapshot::default(),
            )
            .unwrap();
        reg.mark_running(&task.id).unwrap();
        reg.cancel(&task.id).unwrap();

        // The downloader finishing after a cancel must not flip the state.
        assert_eq!(
            reg.complete(&task.id, outcome()).unwrap(),
            TaskStatus::Cancelled
        );
        assert_eq!(
            reg.fail(&task.id, "too late").unwrap(),
            TaskStatus::Cancelled
        );
        assert_eq!(reg.cancel(&task.id).unwrap(), TaskStatus::Cancelled);
        assert_eq!(reg.get(&task.id).unwrap().status, TaskStatus::Cancelled);
    }

    #[test]
    fn test_progress_only_while_running_or_uploading() {
        let dir = tempdir().unwrap();
        let reg = registry(dir.path());

        let task = reg
            .create(
                UserId(1),
                "https://tidal.com/album/1",
                Provider::Tidal,
                SettingsSnapshot::default(),
            )
            .unwrap();

        // Queued: no downloader exists yet.
        let err = reg.update_progress(&task.id, 10, None).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidTransition { .. }));

        reg.mark_running(&task.id).unwrap();
        reg.update_progress(&task.id, 40, None).unwrap();

        reg.mark_uploading(&task.id).unwrap();
        reg.update_progress(&task.id, 80, Some("Converting...".to_string()))
            .unwrap();
        assert_eq!(reg.get(&task.id).unwrap().progress, 80);

        reg.cancel(&task.id).unwrap();
        let err = reg.update_progress(&task.id, 90, None).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidTransition { .. }));
        assert_eq!(reg.get(&task.id).unwrap().progress, 80);
    }

    #[test]
    fn test_terminal_task_is_archived() {
        let dir = tempdir().unwrap();
        let history = HistoryStore::new(dir.path());
        let reg = TaskRegistry::new(HistoryStore::new(dir.path()));

        let task = reg
            .create(
                UserId(1),
                "https://tidal.com/album/1",
                Provider::Tidal,
                SettingsSnapshot::default(),
            )
            .unwrap();
        reg.mark_running(&task.id).unwrap();
        reg.fail(&task.id, "network down").unwrap();

        let archived = history.load(UserId(1), &task.id).unwrap();
        assert_eq!(archived.status, TaskStatus::Failed);
        assert_eq!(archived.error.as_deref(), Some("network down"));
    }

    #[test]
    fn test_active_count_and_listing() {
        let dir = tempdir().unwrap();
        let reg = registry(dir.path());

        let a = reg
            .create(
                UserId(1),
                "https://tidal.com/album/1",
                Provider::Tidal,
                SettingsSnapshot::default(),
            )
            .unwrap();
        reg.create(
            UserId(1),
            "https://tidal.com/album/2",
            Provider::Tidal,
            SettingsSnapshot::default(),
        )
        .unwrap();

        assert_eq!(reg.active_count_for(UserId(1)).unwrap(), 2);
        assert_eq!(reg.list_active().unwrap().len(), 2);

        reg.cancel(&a.id).unwrap();
        assert_eq!(reg.active_count_for(UserId(1)).unwrap(), 1);
        assert_eq!(reg.list_for(UserId(1)).unwrap().len(), 2);
    }

    #[test]
    fn test_prune_finished() {
        let dir = tempdir().unwrap();
        let reg = registry(dir.path());

        let a = reg
            .create(
                UserId(1),
                "https://tidal.com/album/1",
                Provider::Tidal,
                SettingsSnapshot::default(),
            )
            .unwrap();
        reg.create(
            UserId(1),
            "https://tidal.com/album/2",
            Provider::Tidal,
            SettingsSnapshot::default(),
        )
        .unwrap();
        reg.cancel(&a.id).unwrap();

        assert_eq!(reg.prune_finished().unwrap(), 1);
        assert!(matches!(reg.get(&a.id), Err(RegistryError::NotFound(_))));
        assert_eq!(reg.list_for(UserId(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_not_found() {
        let dir = tempdir().unwrap();
        let reg = registry(dir.path());

        let id = TaskId::from("task-missing");
        assert!(matches!(reg.get(&id), Err(RegistryError::NotFound(_))));
        assert!(matches!(
            reg.mark_running(&id),
            Err(RegistryError::NotFound(_))
        ));
    }
}
