//! Error types for orchestration.

use thiserror::Error;
use tunepilot_config::ConfigError;
use tunepilot_downloader::DownloadError;
use tunepilot_registry::RegistryError;
use tunepilot_uploader::UploadError;

/// Errors that can occur during orchestration.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// The URL does not belong to any supported provider.
    #[error("unsupported URL: {0}")]
    UnsupportedUrl(String),

    /// The orchestrator is shutting down and takes no new work.
    #[error("orchestrator is shutting down")]
    Shutdown,

    /// Registry error.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Download error.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Delivery error.
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Lock poisoned (thread panicked while holding lock).
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result type alias for orchestration operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;
