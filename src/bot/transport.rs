use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile};

/// Outbound side of a conversation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReplySender: Send + Sync {
    /// Send a plain text message
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()>;

    /// Send an in-memory image with a caption
    async fn send_photo(&self, chat_id: ChatId, bytes: Vec<u8>, caption: &str) -> Result<()>;
}

/// Telegram-backed reply sender.
#[derive(Clone)]
pub struct TelegramReplySender {
    bot: Bot,
}

impl TelegramReplySender {
    /// Wrap a bot handle
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ReplySender for TelegramReplySender {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.bot.send_message(chat_id, text).await?;
        Ok(())
    }

    async fn send_photo(&self, chat_id: ChatId, bytes: Vec<u8>, caption: &str) -> Result<()> {
        self.bot
            .send_photo(chat_id, InputFile::memory(bytes).file_name("image.png"))
            .caption(caption)
            .await?;
        Ok(())
    }
}
