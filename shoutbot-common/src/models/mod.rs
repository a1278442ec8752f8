// File: shoutbot-common/src/models/mod.rs
pub mod auth;
pub mod channel;
pub mod shoutout;
pub mod user;

pub use auth::{DeviceCodeGrant, TokenSet, ValidatedToken};
pub use channel::{Channel, ChannelLiveInfo, ChannelRef, ChannelModerator, DEFAULT_SHOUTOUT_INTERVAL_MINUTES, DEFAULT_SHOUTOUT_TEMPLATE};
pub use shoutout::{AnnouncementColor, LiveChannel, LiveStream, ShoutoutCandidate, ShoutoutTarget};
pub use user::{Pronoun, TwitchUser};
