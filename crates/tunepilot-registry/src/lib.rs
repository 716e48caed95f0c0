//! Task tracking for TunePilot.
//!
//! The [`TaskRegistry`] is the single authority on task lifecycle: every
//! status change flows through it, it enforces the transition table and
//! it archives finished tasks to the download history.

pub mod error;
pub mod registry;

pub use error::{RegistryError, Result};
pub use registry::TaskRegistry;
