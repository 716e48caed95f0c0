//! Event-driven chat notifications.
//!
//! Subscribes to the orchestrator's event stream and turns lifecycle
//! changes into messages. Progress events are deliberately not pushed,
//! /status covers them without flooding the chat.

use teloxide::prelude::*;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use tunepilot_runtime::OrchestratorEvent;

/// Runs until the event channel closes.
pub async fn run_notifier(bot: Bot, mut events: broadcast::Receiver<OrchestratorEvent>) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "notification stream lagged, some updates dropped");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("event channel closed, notifier stopping");
                return;
            }
        };

        let chat = ChatId(event.owner().as_i64());
        let text = match &event {
            OrchestratorEvent::Queued { .. } | OrchestratorEvent::Progress { .. } => continue,
            OrchestratorEvent::Started { task_id, attempt, .. } if *attempt > 1 => {
                Some(format!("Retrying {} (attempt {}).", task_id, attempt))
            }
            OrchestratorEvent::Started { .. } => None,
            OrchestratorEvent::Uploading { task_id, .. } => {
                Some(format!("Download {} finished, sending files...", task_id))
            }
            OrchestratorEvent::Completed { task } => {
                let files = task
                    .outcome
                    .as_ref()
                    .map(|o| o.file_count)
                    .unwrap_or_default();
                Some(format!(
                    "Done! {} delivered ({} file{}).",
                    task.id,
                    files,
                    if files == 1 { "" } else { "s" }
                ))
            }
            OrchestratorEvent::Failed { task, error } => {
                Some(format!("Download {} failed: {}", task.id, error))
            }
            OrchestratorEvent::Cancelled { task_id, .. } => {
                Some(format!("Cancelled {}.", task_id))
            }
        };

        if let Some(text) = text {
            if let Err(e) = bot.send_message(chat, text).await {
                warn!(chat = %chat, error = %e, "failed to send notification");
            }
        }
    }
}
