use crate::config::Settings;
use crate::core::events::Event;
use crate::error::BotError;
use slack_morphism::{
    api::SlackApiChatPostMessageRequest,
    hyper_tokio::SlackClientHyperConnector,
    SlackApiToken, SlackApiTokenValue, SlackChannelId, SlackClient, SlackMessageContent,
};
use tokio::sync::mpsc::Receiver;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct MessagingConfig {
    pub token: String,
    pub default_channel: String,
    pub monitoring_channel: Option<String>,
}

impl MessagingConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            token: settings.slack_token.clone(),
            default_channel: settings.slack_default_channel.clone(),
            monitoring_channel: settings.slack_monitoring_channel.clone(),
        }
    }

    /// Status events only go out when a monitoring channel is configured.
    pub fn channel_for(&self, event: &Event) -> Option<&str> {
        match event.is_monitoring() {
            true => self.monitoring_channel.as_deref(),
            false => Some(self.default_channel.as_str()),
        }
    }
}

/// Posts every event received on `rx` until all senders are gone.
pub async fn initialize_messaging(mut rx: Receiver<Event>, config: MessagingConfig) {
    let client = SlackClient::new(SlackClientHyperConnector::new());
    let token = SlackApiToken::new(SlackApiTokenValue::from(config.token.clone()));

    info!("Messaging engine ready.");
    while let Some(event) = rx.recv().await {
        let Some(channel) = config.channel_for(&event) else {
            continue;
        };

        let text = match event.render() {
            Ok(text) => text,
            Err(e) => {
                error!("Could not render {event:?}. {e}");
                continue;
            }
        };

        let session = client.open_session(&token);
        let request = SlackApiChatPostMessageRequest::new(
            SlackChannelId(channel.to_string()),
            SlackMessageContent::new().with_text(text),
        );
        if let Err(e) = session.chat_post_message(&request).await {
            let error = BotError::Slack(e.to_string());
            error!("{error}");
        };
    }
    info!("Messaging engine stopped.");
}
