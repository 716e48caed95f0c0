//! External downloader integration for TunePilot.
//!
//! Wraps the per-provider CLI tools behind one interface: command
//! construction, process supervision with cancellation and timeout,
//! progress parsing and artifact collection.

pub mod command;
pub mod downloader;
pub mod error;
pub mod patterns;

pub use command::{CommandSpec, DownloaderRegistry};
pub use downloader::Downloader;
pub use error::{DownloadError, Result};
pub use patterns::{classify_error, parse_progress, ErrorClass, ProgressUpdate};
