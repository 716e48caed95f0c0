//! Artifact delivery for TunePilot.
//!
//! Moves finished downloads to their destination: straight into the
//! requesting chat, to an rclone remote, or to a local directory.

pub mod error;
pub mod uploader;

pub use error::{Result, UploadError};
pub use uploader::{ChatDelivery, DeliveryReport, Destination, Uploader};
