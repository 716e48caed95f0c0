//! Crash-safe persistence for TunePilot.
//!
//! All writes go through atomic file operations (write to a temp file in
//! the same directory, then rename) so a crash can never leave a
//! half-written settings or history file behind.
//!
//! # Example
//!
//! ```no_run
//! use tunepilot_persistence::HistoryStore;
//! use tunepilot_models::UserId;
//!
//! let store = HistoryStore::new("/var/lib/tunepilot");
//! let finished = store.list_for(UserId(42)).unwrap();
//! for task in finished {
//!     println!("{}: {:?}", task.url, task.status);
//! }
//! ```

pub mod atomic;
pub mod error;
pub mod history;

pub use atomic::{atomic_write, atomic_write_json, read_json, read_json_optional};
pub use error::{PersistenceError, Result};
pub use history::HistoryStore;
