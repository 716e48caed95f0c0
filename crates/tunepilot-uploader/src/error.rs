//! Error types for delivery operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while delivering an artifact.
#[derive(Error, Debug)]
pub enum UploadError {
    /// The downloaded artifact is gone or empty.
    #[error("artifact missing or empty: {path}")]
    ArtifactMissing { path: PathBuf },

    /// The destination rejected the delivery.
    #[error("delivery failed: {0}")]
    Destination(String),

    /// IO error while reading or copying files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for delivery operations.
pub type Result<T> = std::result::Result<T, UploadError>;
