//! Telegram bot frontend for TunePilot.
//!
//! Exposes the download pipeline over chat commands and pushes
//! lifecycle notifications back as tasks progress.

pub mod bot;
pub mod delivery;
pub mod error;
pub mod handlers;
pub mod notifications;
pub mod state;

pub use bot::TunePilotBot;
pub use error::{Result, TelegramError};
pub use state::BotState;
