//! The download orchestrator.
//!
//! Owns the path from accepted URL to delivered artifact: per-provider
//! concurrency slots, the retry policy for transient failures, live
//! cancellation, and the event stream the bot renders from.
//!
//! Each submitted task gets its own worker and its own cancel flag.
//! The registry stays the single authority on status; the orchestrator
//! only drives transitions through it, so a cancel racing a completion
//! is settled by whichever terminal signal reaches the registry first.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch, Semaphore};
use tracing::{debug, info, warn};

use tunepilot_config::ConfigStore;
use tunepilot_downloader::{Downloader, ProgressUpdate};
use tunepilot_models::{Provider, Task, TaskId, TaskStatus, UserId};
use tunepilot_registry::TaskRegistry;
use tunepilot_uploader::Uploader;

use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, Result};
use crate::event::OrchestratorEvent;

/// Drives download tasks from submission to delivery.
pub struct Orchestrator {
    config: OrchestratorConfig,
    store: Arc<ConfigStore>,
    registry: Arc<TaskRegistry>,
    downloader: Arc<Downloader>,
    uploader: Arc<Uploader>,
    semaphores: HashMap<Provider, Arc<Semaphore>>,
    events: broadcast::Sender<OrchestratorEvent>,
    cancels: Mutex<HashMap<TaskId, watch::Sender<bool>>>,
    shutdown_tx: watch::Sender<bool>,
    shutting_down: AtomicBool,
}

impl Orchestrator {
    /// Creates an orchestrator over the given stores and services.
    pub fn new(
        config: OrchestratorConfig,
        store: Arc<ConfigStore>,
        registry: Arc<TaskRegistry>,
        downloader: Arc<Downloader>,
        uploader: Arc<Uploader>,
    ) -> Self {
        let semaphores = Provider::ALL
            .iter()
            .map(|p| {
                (
                    *p,
                    Arc::new(Semaphore::new(config.concurrency_for(*p))),
                )
            })
            .collect();
        let (events, _) = broadcast::channel(config.event_capacity);
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config,
            store,
            registry,
            downloader,
            uploader,
            semaphores,
            events,
            cancels: Mutex::new(HashMap::new()),
            shutdown_tx,
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Subscribes to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.events.subscribe()
    }

    /// The registry backing this orchestrator.
    pub fn registry(&self) -> Arc<TaskRegistry> {
        Arc::clone(&self.registry)
    }

    /// Accepts a download request: resolves the provider, freezes the
    /// provider's settings into the task and queues a worker for it.
    pub fn submit(self: &Arc<Self>, owner: UserId, url: &str) -> Result<Task> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(OrchestratorError::Shutdown);
        }

        let provider = Provider::detect(url)
            .map_err(|_| OrchestratorError::UnsupportedUrl(url.to_string()))?;
        let settings = self.store.snapshot(provider)?;
        let task = self.registry.create(owner, url, provider, settings)?;

        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.lock_cancels()?.insert(task.id.clone(), cancel_tx);

        self.emit(OrchestratorEvent::Queued { task: task.clone() });

        let orchestrator = Arc::clone(self);
        let worker_task = task.clone();
        tokio::spawn(async move {
            orchestrator.run_task(worker_task, cancel_rx).await;
        });

        Ok(task)
    }

    /// Cancels a task, killing its downloader if one is running.
    /// Returns the status the task had before cancellation; cancelling
    /// an already-finished task reports its final status unchanged.
    pub fn cancel(&self, id: &TaskId) -> Result<TaskStatus> {
        // Read the owner before finalizing; once the task is terminal a
        // concurrent prune may remove the record.
        let owner = self.registry.get(id)?.owner;
        let prior = self.registry.cancel(id)?;
        if prior.is_terminal() {
            return Ok(prior);
        }

        if let Some(cancel_tx) = self.lock_cancels()?.get(id) {
            let _ = cancel_tx.send(true);
        }

        self.emit(OrchestratorEvent::Cancelled {
            task_id: id.clone(),
            owner,
        });
        Ok(prior)
    }

    /// Stops accepting work and cancels every active task. Returns how
    /// many tasks were cancelled.
    pub fn shutdown(&self) -> Result<usize> {
        info!("orchestrator shutting down");
        self.shutting_down.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(true);

        let active = self.registry.list_active()?;
        let mut cancelled = 0;
        for task in active {
            match self.cancel(&task.id) {
                Ok(prior) if !prior.is_terminal() => cancelled += 1,
                Ok(_) => {}
                Err(e) => warn!(task_id = %task.id, error = %e, "failed to cancel during shutdown"),
            }
        }
        Ok(cancelled)
    }

    fn emit(&self, event: OrchestratorEvent) {
        // A send error just means nobody is listening right now.
        let _ = self.events.send(event);
    }

    fn lock_cancels(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<TaskId, watch::Sender<bool>>>> {
        self.cancels
            .lock()
            .map_err(|e| OrchestratorError::LockPoisoned(e.to_string()))
    }

    fn semaphore(&self, provider: Provider) -> Arc<Semaphore> {
        // Every provider variant is seeded in the constructor.
        Arc::clone(&self.semaphores[&provider])
    }

    async fn run_task(self: Arc<Self>, task: Task, cancel_rx: watch::Receiver<bool>) {
        self.clone().drive(task.clone(), cancel_rx).await;
        if let Ok(mut cancels) = self.cancels.lock() {
            cancels.remove(&task.id);
        }
    }

    async fn drive(self: Arc<Self>, task: Task, mut cancel_rx: watch::Receiver<bool>) {
        let id = task.id.clone();
        let owner = task.owner;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let semaphore = self.semaphore(task.provider);
        let permit = tokio::select! {
            permit = semaphore.acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return,
            },
            _ = flagged(&mut cancel_rx) => {
                // cancel() already finalized the task and emitted the event.
                debug!(task_id = %id, "cancelled while queued");
                return;
            }
            _ = flagged(&mut shutdown_rx) => {
                if let Ok(prior) = self.registry.cancel(&id) {
                    if !prior.is_terminal() {
                        self.emit(OrchestratorEvent::Cancelled { task_id: id.clone(), owner });
                    }
                }
                return;
            }
        };

        if self.registry.mark_running(&id).is_err() {
            // Terminal already; a cancel won the race for the slot.
            return;
        }

        let max_attempts = (task.settings.int_or("retry_attempts", 3).clamp(0, 10) as u32) + 1;

        let outcome = loop {
            let attempt = match self.registry.bump_attempts(&id) {
                Ok(attempt) => attempt,
                Err(e) => {
                    warn!(task_id = %id, error = %e, "lost track of task");
                    return;
                }
            };
            self.emit(OrchestratorEvent::Started {
                task_id: id.clone(),
                owner,
                attempt,
            });

            let (progress_tx, progress_rx) = mpsc::channel(32);
            let forwarder = tokio::spawn(Arc::clone(&self).forward_progress(
                id.clone(),
                owner,
                progress_rx,
            ));

            let result = self
                .downloader
                .run(&task, progress_tx, cancel_rx.clone())
                .await;
            let _ = forwarder.await;

            match result {
                Ok(outcome) => break outcome,
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = backoff_delay(
                        self.config.base_backoff,
                        self.config.max_backoff,
                        attempt,
                    );
                    info!(
                        task_id = %id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient failure"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = flagged(&mut cancel_rx) => {
                            self.cleanup(&task);
                            return;
                        }
                    }
                }
                Err(tunepilot_downloader::DownloadError::Cancelled) => {
                    // cancel() already finalized the task.
                    self.cleanup(&task);
                    return;
                }
                Err(e) => {
                    self.finalize_failed(&task, e.to_string());
                    self.cleanup(&task);
                    return;
                }
            }
        };

        // The download slot is only needed while the tool runs.
        drop(permit);

        if self.registry.mark_uploading(&id).is_err() {
            // Cancelled between download and delivery.
            self.cleanup(&task);
            return;
        }
        self.emit(OrchestratorEvent::Uploading {
            task_id: id.clone(),
            owner,
        });

        // The same per-attempt time limit guards delivery, so a hung
        // destination cannot leave the task non-terminal forever.
        let timeout_secs = task.settings.int_or("timeout_seconds", 300).max(1) as u64;
        let delivery = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            self.uploader
                .deliver(&task, &outcome.artifact_path, &self.config.destination),
        );
        tokio::select! {
            result = delivery => {
                match result {
                    Ok(Ok(_)) => match self.registry.complete(&id, outcome) {
                        Ok(TaskStatus::Done) => {
                            if let Ok(done) = self.registry.get(&id) {
                                self.emit(OrchestratorEvent::Completed { task: done });
                            }
                        }
                        Ok(_) => {}
                        Err(e) => warn!(task_id = %id, error = %e, "failed to finalize task"),
                    },
                    Ok(Err(e)) => self.finalize_failed(&task, e.to_string()),
                    Err(_) => self.finalize_failed(
                        &task,
                        format!("delivery timed out after {}s", timeout_secs),
                    ),
                }
            }
            _ = flagged(&mut cancel_rx) => {
                // cancel() already finalized the task; drop the artifact.
                self.cleanup(&task);
            }
        }
    }

    async fn forward_progress(
        self: Arc<Self>,
        id: TaskId,
        owner: UserId,
        mut progress_rx: mpsc::Receiver<ProgressUpdate>,
    ) {
        while let Some(update) = progress_rx.recv().await {
            let percent = match update.percent {
                Some(percent) => percent,
                None => match self.registry.get(&id) {
                    Ok(task) => task.progress,
                    Err(_) => continue,
                },
            };
            if let Err(e) = self
                .registry
                .update_progress(&id, percent, update.stage.clone())
            {
                debug!(task_id = %id, error = %e, "dropping progress update");
                continue;
            }
            self.emit(OrchestratorEvent::Progress {
                task_id: id.clone(),
                owner,
                percent: update.percent,
                stage: update.stage,
            });
        }
    }

    fn finalize_failed(&self, task: &Task, error: String) {
        match self.registry.fail(&task.id, error.clone()) {
            Ok(TaskStatus::Failed) => {
                if let Ok(failed) = self.registry.get(&task.id) {
                    self.emit(OrchestratorEvent::Failed {
                        task: failed,
                        error,
                    });
                }
            }
            Ok(_) => {}
            Err(e) => warn!(task_id = %task.id, error = %e, "failed to finalize task"),
        }
    }

    fn cleanup(&self, task: &Task) {
        if let Err(e) = self.downloader.remove_task_dir(task) {
            warn!(task_id = %task.id, error = %e, "failed to remove task directory");
        }
    }
}

/// Resolves once the watch flag turns true; never resolves if the
/// sender vanishes.
async fn flagged(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn backoff_delay(base: Duration, max: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use tempfile::{tempdir, TempDir};
    use tunepilot_downloader::DownloaderRegistry;
    use tunepilot_persistence::HistoryStore;
    use tunepilot_uploader::{ChatDelivery, Destination, UploadError};

    struct TestChat {
        sent: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl ChatDelivery for TestChat {
        async fn send_file(
            &self,
            _owner: UserId,
            path: &Path,
        ) -> std::result::Result<(), UploadError> {
            self.sent.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    struct Harness {
        _dir: TempDir,
        orchestrator: Arc<Orchestrator>,
        chat: Arc<TestChat>,
    }

    fn harness(script_body: &str, retry_attempts: i64) -> Harness {
        harness_with(script_body, retry_attempts, 3)
    }

    fn harness_with(script_body: &str, retry_attempts: i64, concurrency: usize) -> Harness {
        let dir = tempdir().unwrap();

        let script = dir.path().join("fake-downloader");
        fs::write(&script, format!("#!/bin/sh\n{}\n", script_body)).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let store = Arc::new(ConfigStore::open(dir.path().join("config")).unwrap());
        store
            .set_raw(
                Provider::Deezer,
                "download_base_path",
                &dir.path().join("downloads").display().to_string(),
            )
            .unwrap();
        store
            .set_raw(Provider::Deezer, "timeout_seconds", "10")
            .unwrap();
        store
            .set_raw(
                Provider::Deezer,
                "retry_attempts",
                &retry_attempts.to_string(),
            )
            .unwrap();

        let registry = Arc::new(TaskRegistry::new(HistoryStore::new(
            dir.path().join("history"),
        )));
        let downloader = Arc::new(Downloader::new(
            DownloaderRegistry::new().with_binary(Provider::Deezer, script.display().to_string()),
        ));
        let chat = Arc::new(TestChat {
            sent: Mutex::new(Vec::new()),
        });
        let uploader = Arc::new(Uploader::new(chat.clone()));

        let config = OrchestratorConfig::new()
            .with_destination(Destination::Chat)
            .with_concurrency(Provider::Deezer, concurrency)
            .with_backoff(Duration::from_millis(10), Duration::from_millis(50));

        let orchestrator = Arc::new(Orchestrator::new(
            config, store, registry, downloader, uploader,
        ));

        Harness {
            _dir: dir,
            orchestrator,
            chat,
        }
    }

    async fn wait_terminal(
        rx: &mut broadcast::Receiver<OrchestratorEvent>,
        id: &TaskId,
    ) -> OrchestratorEvent {
        loop {
            let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
                .await
                .expect("timed out waiting for terminal event")
                .expect("event channel closed");
            if event.task_id() == id && event.is_terminal() {
                return event;
            }
        }
    }

    const URL: &str = "https://deezer.com/album/1";

    #[tokio::test]
    async fn test_submit_to_completion() {
        let h = harness("echo \"Downloading 50%\"\ntouch \"$2/track.flac\"", 3);
        let mut events = h.orchestrator.subscribe();

        let task = h.orchestrator.submit(UserId(1), URL).unwrap();
        let event = wait_terminal(&mut events, &task.id).await;

        assert!(matches!(event, OrchestratorEvent::Completed { .. }));
        let done = h.orchestrator.registry().get(&task.id).unwrap();
        assert_eq!(done.status, TaskStatus::Done);
        assert_eq!(done.outcome.as_ref().unwrap().file_count, 1);
        assert_eq!(h.chat.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_url() {
        let h = harness("exit 0", 3);
        let err = h
            .orchestrator
            .submit(UserId(1), "https://example.com/nope")
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::UnsupportedUrl(_)));
    }

    #[tokio::test]
    async fn test_duplicate_submission_rejected() {
        let h = harness("sleep 5", 3);
        h.orchestrator.submit(UserId(1), URL).unwrap();
        let err = h.orchestrator.submit(UserId(1), URL).unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Registry(
                tunepilot_registry::RegistryError::DuplicateActiveRequest { .. }
            )
        ));
        h.orchestrator.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_fatal_failure_not_retried() {
        let h = harness("echo \"401 Unauthorized\" >&2\nexit 1", 3);
        let mut events = h.orchestrator.subscribe();

        let task = h.orchestrator.submit(UserId(1), URL).unwrap();
        let event = wait_terminal(&mut events, &task.id).await;

        assert!(matches!(event, OrchestratorEvent::Failed { .. }));
        let failed = h.orchestrator.registry().get(&task.id).unwrap();
        assert_eq!(failed.status, TaskStatus::Failed);
        assert_eq!(failed.attempts, 1);
    }

    #[tokio::test]
    async fn test_transient_failure_retried() {
        // Fails once with a transient error, succeeds on the second try.
        let h = harness(
            concat!(
                "if [ -f \"$2/.attempted\" ]; then\n",
                "  touch \"$2/track.flac\"\n",
                "else\n",
                "  touch \"$2/.attempted\"\n",
                "  echo \"connection reset by peer\" >&2\n",
                "  exit 1\n",
                "fi"
            ),
            3,
        );
        let mut events = h.orchestrator.subscribe();

        let task = h.orchestrator.submit(UserId(1), URL).unwrap();
        let event = wait_terminal(&mut events, &task.id).await;

        assert!(matches!(event, OrchestratorEvent::Completed { .. }));
        assert_eq!(h.orchestrator.registry().get(&task.id).unwrap().attempts, 2);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let h = harness("echo \"connection reset by peer\" >&2\nexit 1", 1);
        let mut events = h.orchestrator.subscribe();

        let task = h.orchestrator.submit(UserId(1), URL).unwrap();
        let event = wait_terminal(&mut events, &task.id).await;

        assert!(matches!(event, OrchestratorEvent::Failed { .. }));
        // retry_attempts = 1 means one retry after the first attempt.
        assert_eq!(h.orchestrator.registry().get(&task.id).unwrap().attempts, 2);
    }

    #[tokio::test]
    async fn test_cancel_running_task() {
        let h = harness("sleep 30", 3);
        let mut events = h.orchestrator.subscribe();

        let task = h.orchestrator.submit(UserId(1), URL).unwrap();
        // Wait until the download attempt has started.
        loop {
            let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
                .await
                .unwrap()
                .unwrap();
            if matches!(event, OrchestratorEvent::Started { .. }) {
                break;
            }
        }

        let prior = h.orchestrator.cancel(&task.id).unwrap();
        assert_eq!(prior, TaskStatus::Running);

        let event = wait_terminal(&mut events, &task.id).await;
        assert!(matches!(event, OrchestratorEvent::Cancelled { .. }));
        assert_eq!(
            h.orchestrator.registry().get(&task.id).unwrap().status,
            TaskStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_cancel_after_prune_reports_not_found() {
        let h = harness("sleep 30", 3);
        let mut events = h.orchestrator.subscribe();

        let task = h.orchestrator.submit(UserId(2), URL).unwrap();
        let prior = h.orchestrator.cancel(&task.id).unwrap();
        assert!(!prior.is_terminal());
        let event = wait_terminal(&mut events, &task.id).await;
        assert_eq!(event.owner(), UserId(2));

        // Once the record is pruned, a repeat cancel reports the task
        // gone instead of failing halfway through.
        h.orchestrator.registry().prune_finished().unwrap();
        let err = h.orchestrator.cancel(&task.id).unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Registry(tunepilot_registry::RegistryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let h = harness("touch \"$2/track.flac\"", 3);
        let mut events = h.orchestrator.subscribe();

        let task = h.orchestrator.submit(UserId(1), URL).unwrap();
        wait_terminal(&mut events, &task.id).await;

        // Cancelling a finished task reports its final status unchanged.
        assert_eq!(h.orchestrator.cancel(&task.id).unwrap(), TaskStatus::Done);
        assert_eq!(
            h.orchestrator.registry().get(&task.id).unwrap().status,
            TaskStatus::Done
        );
    }

    #[tokio::test]
    async fn test_provider_concurrency_limit() {
        let h = harness_with("sleep 30", 3, 1);

        let first = h.orchestrator.submit(UserId(1), URL).unwrap();
        let second = h
            .orchestrator
            .submit(UserId(1), "https://deezer.com/album/2")
            .unwrap();

        // Give the first worker time to claim the only slot.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(
            h.orchestrator.registry().get(&first.id).unwrap().status,
            TaskStatus::Running
        );
        assert_eq!(
            h.orchestrator.registry().get(&second.id).unwrap().status,
            TaskStatus::Queued
        );

        // Freeing the slot lets the queued task start.
        h.orchestrator.cancel(&first.id).unwrap();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        loop {
            if h.orchestrator.registry().get(&second.id).unwrap().status == TaskStatus::Running {
                break;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "queued task never got the freed slot"
            );
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        h.orchestrator.shutdown().unwrap();
    }

    /// Delivery sink that never completes.
    struct StalledChat;

    #[async_trait]
    impl ChatDelivery for StalledChat {
        async fn send_file(
            &self,
            _owner: UserId,
            _path: &Path,
        ) -> std::result::Result<(), UploadError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_hung_delivery_is_force_failed() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("fake-downloader");
        fs::write(&script, "#!/bin/sh\ntouch \"$2/track.flac\"\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let store = Arc::new(ConfigStore::open(dir.path().join("config")).unwrap());
        store
            .set_raw(
                Provider::Deezer,
                "download_base_path",
                &dir.path().join("downloads").display().to_string(),
            )
            .unwrap();
        store
            .set_raw(Provider::Deezer, "timeout_seconds", "1")
            .unwrap();

        let registry = Arc::new(TaskRegistry::new(HistoryStore::new(
            dir.path().join("history"),
        )));
        let downloader = Arc::new(Downloader::new(
            DownloaderRegistry::new().with_binary(Provider::Deezer, script.display().to_string()),
        ));
        let uploader = Arc::new(Uploader::new(Arc::new(StalledChat)));
        let config = OrchestratorConfig::new().with_destination(Destination::Chat);
        let orchestrator = Arc::new(Orchestrator::new(
            config, store, registry, downloader, uploader,
        ));

        let mut events = orchestrator.subscribe();
        let task = orchestrator.submit(UserId(1), URL).unwrap();
        let event = wait_terminal(&mut events, &task.id).await;

        assert!(matches!(event, OrchestratorEvent::Failed { .. }));
        let failed = orchestrator.registry().get(&task.id).unwrap();
        assert_eq!(failed.status, TaskStatus::Failed);
        assert!(failed
            .error
            .as_deref()
            .unwrap_or("")
            .contains("delivery timed out"));
    }

    #[tokio::test]
    async fn test_shutdown_cancels_and_rejects() {
        let h = harness("sleep 30", 3);
        let task = h.orchestrator.submit(UserId(1), URL).unwrap();

        let cancelled = h.orchestrator.shutdown().unwrap();
        assert_eq!(cancelled, 1);
        assert_eq!(
            h.orchestrator.registry().get(&task.id).unwrap().status,
            TaskStatus::Cancelled
        );

        let err = h
            .orchestrator
            .submit(UserId(1), "https://deezer.com/album/2")
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Shutdown));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let base = Duration::from_secs(2);
        let max = Duration::from_secs(60);
        assert_eq!(backoff_delay(base, max, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, max, 2), Duration::from_secs(4));
        assert_eq!(backoff_delay(base, max, 3), Duration::from_secs(8));
        assert_eq!(backoff_delay(base, max, 10), Duration::from_secs(60));
    }
}
