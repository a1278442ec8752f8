// shoutbot-core/src/connections/mod.rs
//
// Per-channel chat sessions and the pool that owns them.

use async_trait::async_trait;

use crate::platforms::ChatMessage;
use crate::Error;

pub mod pool;
pub mod session;

pub use pool::{ConnectionPool, PoolHandle};
pub use session::ChannelSession;

/// Result of asking the pool for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    AlreadyConnected,
    NewlyConnected,
}

/// Receives every chat message a session reads, one at a time per channel.
#[async_trait]
pub trait ChatEventHandler: Send + Sync {
    async fn on_message(&self, message: ChatMessage);
}

/// Sends a plain chat line to a channel the bot is in.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatOutbound: Send + Sync {
    async fn send_message(&self, channel: &str, text: &str) -> Result<(), Error>;
}

/// Joining and leaving channels.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChannelMembership: Send + Sync {
    async fn ensure_connected(&self, channel: &str) -> Result<JoinOutcome, Error>;

    /// Returns false when there was no session for `channel`.
    async fn remove(&self, channel: &str) -> Result<bool, Error>;
}
