use crate::{
    core::events::Event,
    error::{BotError, BotResult},
};
use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

/// Where the watcher hands its events. Delivery is awaited but never retried by the caller.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: Event) -> BotResult<()>;
}

/// Forwards events to the messaging service over its MPSC channel.
#[derive(Clone)]
pub struct ChannelSink {
    sender: Sender<Event>,
}

impl ChannelSink {
    pub fn new(sender: Sender<Event>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl NotificationSink for ChannelSink {
    async fn notify(&self, event: Event) -> BotResult<()> {
        self.sender.send(event).await.map_err(|e| {
            BotError::ChannelSend(format!("Could not send message to MPSC channel. {e}"))
        })
    }
}
