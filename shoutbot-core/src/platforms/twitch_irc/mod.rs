pub mod client;
pub mod connector;

pub use client::{ParsedTwitchMsg, TwitchIrcClient};
pub use connector::TwitchIrcConnector;
