// File: src/platforms/mod.rs

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::Error;

pub mod pronouns;
pub mod twitch;
pub mod twitch_irc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    /// Terminal: the session was shut down and will not be reused.
    Closed,
}

/// Login used to authenticate a chat connection.
#[derive(Clone, PartialEq, Eq)]
pub struct ChatCredentials {
    pub login: String,
    pub oauth_token: String,
}

impl std::fmt::Debug for ChatCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCredentials")
            .field("login", &self.login)
            .field("oauth_token", &"<redacted>")
            .finish()
    }
}

/// Role flags as reported by the chat protocol. Informational only; command
/// authorization is checked against storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderRoles {
    pub moderator: bool,
    pub broadcaster: bool,
    pub bot: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    /// Channel login without the leading `#`.
    pub channel: String,
    pub room_id: String,
    pub user_id: String,
    pub login: String,
    pub display_name: String,
    pub text: String,
    pub roles: SenderRoles,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Connected,
    Message(ChatMessage),
    Notice(String),
    Error(String),
    /// The remote side closed or asked us to reconnect.
    Closed,
}

/// Write half of an open chat connection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_privmsg(&self, channel: &str, text: &str) -> Result<(), Error>;
    async fn close(&self) -> Result<(), Error>;
}

/// A freshly opened connection: the writer plus the bounded queue of inbound
/// events for one channel.
pub struct ChatLink {
    pub transport: Box<dyn ChatTransport>,
    pub events: mpsc::Receiver<ChatEvent>,
}

/// Opens chat connections. One call yields one connection joined to `channel`.
#[async_trait]
pub trait ChatConnector: Send + Sync {
    async fn open(&self, channel: &str, credentials: &ChatCredentials) -> Result<ChatLink, Error>;
}
