//! Error types for configuration operations.

use thiserror::Error;
use tunepilot_persistence::PersistenceError;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The key is not registered in the schema.
    #[error("unknown setting: {0}")]
    UnknownKey(String),

    /// No preset with that name is shipped.
    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    /// No backup snapshot with that identifier exists.
    #[error("unknown backup: {0}")]
    UnknownBackup(String),

    /// The value failed the key's validation rule.
    #[error("invalid value for {key}: {reason}")]
    Validation { key: String, reason: String },

    /// Persistence error.
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Lock poisoned (thread panicked while holding lock).
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
