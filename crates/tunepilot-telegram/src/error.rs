//! Error types for the Telegram bot.

use thiserror::Error;

/// Errors that can occur in the Telegram bot.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Bot token not provided or invalid.
    #[error("Telegram bot token not set. Set TELEGRAM_BOT_TOKEN environment variable.")]
    NoToken,

    /// Failed to start the bot.
    #[error("Failed to start bot: {0}")]
    BotStartFailed(String),

    /// Orchestrator error.
    #[error(transparent)]
    Orchestrator(#[from] tunepilot_runtime::OrchestratorError),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] tunepilot_config::ConfigError),

    /// Registry error.
    #[error(transparent)]
    Registry(#[from] tunepilot_registry::RegistryError),

    /// Persistence error.
    #[error(transparent)]
    Persistence(#[from] tunepilot_persistence::PersistenceError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Telegram operations.
pub type Result<T> = std::result::Result<T, TelegramError>;
