//! Shared bot state.
//!
//! Wires the full pipeline together: config store, task registry,
//! downloader, Telegram-backed uploader and the orchestrator on top.

use std::path::Path;
use std::sync::Arc;

use teloxide::prelude::*;
use tracing::info;

use tunepilot_config::ConfigStore;
use tunepilot_downloader::{Downloader, DownloaderRegistry};
use tunepilot_models::Provider;
use tunepilot_persistence::HistoryStore;
use tunepilot_registry::TaskRegistry;
use tunepilot_runtime::{Orchestrator, OrchestratorConfig};
use tunepilot_uploader::Uploader;

use crate::delivery::TelegramDelivery;
use crate::error::Result;

/// Everything the handlers need, shared across updates.
pub struct BotState {
    /// Per-provider settings.
    pub store: Arc<ConfigStore>,
    /// Live task tracking.
    pub registry: Arc<TaskRegistry>,
    /// Archived download history.
    pub history: HistoryStore,
    /// The download engine.
    pub orchestrator: Arc<Orchestrator>,
}

impl BotState {
    /// Builds the full pipeline rooted at `data_dir`, delivering files
    /// back through `bot`.
    pub fn new(data_dir: &Path, bot: Bot) -> Result<Arc<Self>> {
        let store = Arc::new(ConfigStore::open(data_dir.join("config"))?);
        let registry = Arc::new(TaskRegistry::new(HistoryStore::new(data_dir)));
        let history = HistoryStore::new(data_dir);

        let downloader = Arc::new(Downloader::new(DownloaderRegistry::new()));
        let uploader = Arc::new(Uploader::new(Arc::new(TelegramDelivery::new(bot))));

        // Size download slots from each provider's configured limit.
        let mut config = OrchestratorConfig::new();
        for provider in Provider::ALL {
            let limit = store
                .snapshot(provider)?
                .int_or("downloads_concurrent_max", 3)
                .clamp(1, 10) as usize;
            config = config.with_concurrency(provider, limit);
        }

        let orchestrator = Arc::new(Orchestrator::new(
            config,
            Arc::clone(&store),
            Arc::clone(&registry),
            downloader,
            uploader,
        ));

        info!(data_dir = %data_dir.display(), "bot state initialized");

        Ok(Arc::new(Self {
            store,
            registry,
            history,
            orchestrator,
        }))
    }
}
