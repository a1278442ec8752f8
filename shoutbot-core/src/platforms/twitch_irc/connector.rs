// src/platforms/twitch_irc/connector.rs

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;

use crate::platforms::twitch_irc::client::TwitchIrcClient;
use crate::platforms::{ChatConnector, ChatCredentials, ChatEvent, ChatLink};
use crate::Error;

pub const TWITCH_IRC_HOST: &str = "irc.chat.twitch.tv";
pub const TWITCH_IRC_TLS_PORT: u16 = 6697;

/// Opens one TLS IRC connection per channel.
#[derive(Debug, Clone)]
pub struct TwitchIrcConnector {
    host: String,
    port: u16,
    queue_capacity: usize,
}

impl Default for TwitchIrcConnector {
    fn default() -> Self {
        Self {
            host: TWITCH_IRC_HOST.to_string(),
            port: TWITCH_IRC_TLS_PORT,
            queue_capacity: 256,
        }
    }
}

impl TwitchIrcConnector {
    pub fn new(host: &str, port: u16, queue_capacity: usize) -> Self {
        Self {
            host: host.to_string(),
            port,
            queue_capacity: queue_capacity.max(1),
        }
    }
}

#[async_trait]
impl ChatConnector for TwitchIrcConnector {
    async fn open(&self, channel: &str, credentials: &ChatCredentials) -> Result<ChatLink, Error> {
        let (tx, rx) = mpsc::channel::<ChatEvent>(self.queue_capacity);
        let client = TwitchIrcClient::connect(
            &self.host,
            self.port,
            &credentials.login,
            &credentials.oauth_token,
            channel,
            tx,
        )
        .await?;
        info!("(TwitchIrcConnector) opened connection for #{} as {}", channel, credentials.login);
        Ok(ChatLink {
            transport: Box::new(client),
            events: rx,
        })
    }
}
