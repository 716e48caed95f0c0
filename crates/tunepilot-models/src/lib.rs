//! Core data models for TunePilot.
//!
//! This crate provides the fundamental data types used throughout the
//! TunePilot system: typed identifiers, music providers, download tasks
//! and their lifecycle, and configuration value types.

pub mod ids;
pub mod provider;
pub mod settings;
pub mod task;

pub use ids::{BackupId, TaskId, UserId};
pub use provider::{Provider, UnknownProvider};
pub use settings::{ConfigValue, SettingsSnapshot};
pub use task::{DownloadOutcome, Task, TaskStatus};
