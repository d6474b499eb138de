use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use tracing::debug;

/// Copies one source-channel message to one destination chat.
///
/// Implemented as a content copy rather than a protocol-level forward so
/// destinations that restrict forwarded-tagged content still accept it.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward_post(&self, message_id: i64, dest_chat_id: i64) -> Result<()>;
}

/// Production forwarder backed by the Bot API `copyMessage` call.
#[derive(Clone)]
pub struct BotForwarder {
    bot: Bot,
    source_channel: ChatId,
}

impl BotForwarder {
    pub fn new(bot: Bot, source_channel_id: i64) -> Self {
        Self {
            bot,
            source_channel: ChatId(source_channel_id),
        }
    }
}

#[async_trait]
impl Forwarder for BotForwarder {
    async fn forward_post(&self, message_id: i64, dest_chat_id: i64) -> Result<()> {
        debug!(message_id, dest_chat_id, "copying message");
        self.bot
            .copy_message(
                ChatId(dest_chat_id),
                self.source_channel,
                MessageId(message_id as i32),
            )
            .await
            .with_context(|| format!("failed to copy message {message_id} to {dest_chat_id}"))?;
        Ok(())
    }
}
