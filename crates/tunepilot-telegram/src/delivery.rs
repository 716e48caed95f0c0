//! Chat delivery through Telegram.

use std::path::Path;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::InputFile;
use tracing::debug;

use tunepilot_models::UserId;
use tunepilot_uploader::{ChatDelivery, UploadError};

/// Sends finished files into the requesting chat as documents.
pub struct TelegramDelivery {
    bot: Bot,
}

impl TelegramDelivery {
    /// Creates a delivery backend over the given bot.
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatDelivery for TelegramDelivery {
    async fn send_file(
        &self,
        owner: UserId,
        path: &Path,
    ) -> std::result::Result<(), UploadError> {
        debug!(owner = %owner, path = %path.display(), "sending file to chat");
        self.bot
            .send_document(ChatId(owner.as_i64()), InputFile::file(path))
            .await
            .map_err(|e| UploadError::Destination(e.to_string()))?;
        Ok(())
    }
}
