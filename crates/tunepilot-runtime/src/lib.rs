//! Download orchestration for TunePilot.
//!
//! Combines the config store, task registry, downloader and uploader
//! into one engine: submit a URL, get a tracked task, receive events as
//! it moves through the pipeline.

pub mod config;
pub mod error;
pub mod event;
pub mod orchestrator;

pub use config::OrchestratorConfig;
pub use error::{OrchestratorError, Result};
pub use event::OrchestratorEvent;
pub use orchestrator::Orchestrator;
