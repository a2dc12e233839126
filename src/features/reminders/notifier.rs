//! Outgoing message delivery used by the scheduler

use anyhow::Result;
use async_trait::async_trait;
use serenity::http::Http;
use serenity::model::id::{ChannelId, MessageId, UserId};
use std::sync::Arc;

use crate::core::{truncate_for_message, Screen};

/// Where a delivered message ended up, so it can be deleted later
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub channel_id: u64,
    pub message_id: u64,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a screen to the user's direct messages
    async fn send(&self, user_id: u64, screen: &Screen) -> Result<SentMessage>;

    /// Delete a previously sent message
    async fn delete(&self, channel_id: u64, message_id: u64) -> Result<()>;
}

/// Delivers through Discord DMs
pub struct SerenityNotifier {
    http: Arc<Http>,
}

impl SerenityNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Notifier for SerenityNotifier {
    async fn send(&self, user_id: u64, screen: &Screen) -> Result<SentMessage> {
        let dm = UserId(user_id).create_dm_channel(&self.http).await?;
        let content = truncate_for_message(&screen.text);
        let message = dm
            .send_message(&self.http, |m| {
                m.content(content);
                if !screen.keyboard.is_empty() {
                    m.set_components(screen.keyboard.to_components());
                }
                m
            })
            .await?;

        Ok(SentMessage {
            channel_id: message.channel_id.0,
            message_id: message.id.0,
        })
    }

    async fn delete(&self, channel_id: u64, message_id: u64) -> Result<()> {
        ChannelId(channel_id)
            .delete_message(&self.http, MessageId(message_id))
            .await?;
        Ok(())
    }
}
