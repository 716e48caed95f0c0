//! Error types for download operations.

use thiserror::Error;

/// Errors that can occur while running an external downloader.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Recoverable failure; the attempt may be retried.
    #[error("transient download failure: {0}")]
    Transient(String),

    /// Permanent failure; retrying would not help.
    #[error("download failed: {0}")]
    Fatal(String),

    /// The provider's downloader binary is not installed.
    #[error("downloader binary not found: {0}")]
    BinaryNotFound(String),

    /// The download was cancelled and the process killed.
    #[error("download cancelled")]
    Cancelled,

    /// The download exceeded its configured time limit.
    #[error("download timed out after {0}s")]
    TimedOut(u64),

    /// IO error while spawning or reading from the process.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// Whether another attempt is worth making.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DownloadError::Transient(_) | DownloadError::TimedOut(_))
    }
}

/// Result type alias for download operations.
pub type Result<T> = std::result::Result<T, DownloadError>;
