//! Provider configuration management for TunePilot.
//!
//! This crate owns the settings schema (known keys, validation rules,
//! defaults), the shipped presets, and the [`ConfigStore`] that persists
//! one settings document per provider with timestamped backups.

pub mod error;
pub mod presets;
pub mod schema;
pub mod store;

pub use error::{ConfigError, Result};
pub use presets::{preset, presets, Preset};
pub use schema::{default_settings, registry, spec_for, KeySpec, ValueRule};
pub use store::{ConfigStore, ProviderConfig, SummarySection, ValidationIssue};
