//! Main Telegram bot implementation.

use std::path::Path;
use std::sync::Arc;

use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use tracing::{info, warn};

use crate::error::{Result, TelegramError};
use crate::handlers::{handle_command, handle_url_message, Command};
use crate::notifications::run_notifier;
use crate::state::BotState;

/// The Telegram bot for TunePilot.
pub struct TunePilotBot {
    /// The teloxide bot instance.
    bot: Bot,
    /// Shared state across handlers.
    state: Arc<BotState>,
}

impl TunePilotBot {
    /// Create a new bot instance.
    ///
    /// Requires `TELEGRAM_BOT_TOKEN` environment variable to be set.
    pub fn new(data_dir: &Path) -> Result<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN").map_err(|_| TelegramError::NoToken)?;
        let bot = Bot::new(token);
        let state = BotState::new(data_dir, bot.clone())?;

        Ok(Self { bot, state })
    }

    /// Get the bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| TelegramError::BotStartFailed(e.to_string()))?;
        Ok(me.username().to_string())
    }

    /// Start the bot in polling mode.
    pub async fn start_polling(&self) -> Result<()> {
        info!("starting bot in polling mode");

        // Push lifecycle notifications from the orchestrator.
        let notify_bot = self.bot.clone();
        let events = self.state.orchestrator.subscribe();
        tokio::spawn(async move {
            run_notifier(notify_bot, events).await;
        });

        let state_for_commands = Arc::clone(&self.state);
        let state_for_messages = Arc::clone(&self.state);

        let handler = dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                        let state = Arc::clone(&state_for_commands);
                        async move { handle_command(bot, msg, cmd, state).await }
                    }),
            )
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| {
                        // Unrecognized commands: start with / but didn't parse.
                        msg.text().map(|t| t.starts_with('/')).unwrap_or(false)
                    })
                    .endpoint(move |bot: Bot, msg: Message| async move {
                        if let Some(text) = msg.text() {
                            bot.send_message(
                                msg.chat.id,
                                format!(
                                    "Unknown command: {}\n\nUse /help to see available commands.",
                                    text.split_whitespace().next().unwrap_or(text)
                                ),
                            )
                            .await?;
                        }
                        Ok(())
                    }),
            )
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| {
                        // Bare links are treated as download requests.
                        msg.text()
                            .map(|t| t.starts_with("http://") || t.starts_with("https://"))
                            .unwrap_or(false)
                    })
                    .endpoint(move |bot: Bot, msg: Message| {
                        let state = Arc::clone(&state_for_messages);
                        async move { handle_url_message(bot, msg, state).await }
                    }),
            );

        Dispatcher::builder(self.bot.clone(), handler)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        // Dispatcher returned (Ctrl+C); wind the pipeline down.
        match self.state.orchestrator.shutdown() {
            Ok(cancelled) if cancelled > 0 => {
                info!(cancelled, "cancelled active downloads on shutdown")
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "error during orchestrator shutdown"),
        }

        info!("bot stopped");
        Ok(())
    }
}
