// src/config.rs

use std::path::PathBuf;
use std::time::Duration;

use crate::Error;

pub const DEFAULT_COMMAND_PREFIX: &str = "?";
pub const DEFAULT_TOKEN_FILE: &str = "Properties/twitch_token.json";
pub const SHUTDOWN_NOTICE: &str =
    "Bot is shutting down for maintenance. We'll be back soon! 🔧";

/// Process-wide, immutable settings. Built once at startup and handed to every
/// component that needs them.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub client_id: String,
    pub client_secret: String,
    pub bot_username: String,
    /// Channel the bot always sits in; `?join` is meant to be used there.
    pub home_channel: String,
    pub command_prefix: String,
    pub token_file: PathBuf,
    pub shoutouts: ShoutoutSettings,
    pub refresh: RefreshSettings,
}

/// How the per-target window is derived for automatic shoutouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetWindow {
    Fixed(Duration),
    /// One hour spread evenly over the channel's targets.
    Spread,
}

impl TargetWindow {
    pub fn window_for(&self, target_count: usize) -> Duration {
        match self {
            TargetWindow::Fixed(d) => *d,
            TargetWindow::Spread => Duration::from_secs(3600) / target_count.max(1) as u32,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShoutoutSettings {
    pub channel_cooldown: Duration,
    pub user_cooldown: Duration,
    pub scheduler_interval: Duration,
    pub scheduler_backoff: Duration,
    pub live_poll_interval: Duration,
    pub target_window: TargetWindow,
    pub shutdown_grace: Duration,
    pub api_timeout: Duration,
}

impl Default for ShoutoutSettings {
    fn default() -> Self {
        Self {
            channel_cooldown: Duration::from_secs(2 * 60),
            user_cooldown: Duration::from_secs(60 * 60),
            scheduler_interval: Duration::from_secs(2 * 60),
            scheduler_backoff: Duration::from_secs(5 * 60),
            live_poll_interval: Duration::from_secs(2 * 60),
            target_window: TargetWindow::Fixed(Duration::from_secs(60 * 60)),
            shutdown_grace: Duration::from_secs(1),
            api_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub lead: Duration,
    pub poll_interval: Duration,
    pub retry_backoff: Duration,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            lead: Duration::from_secs(5 * 60),
            poll_interval: Duration::from_secs(15 * 60),
            retry_backoff: Duration::from_secs(5 * 60),
        }
    }
}

impl BotConfig {
    /// Reads the required `TWITCH_*` variables from the process environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, Error> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("{key} is not set")))
        };

        Ok(Self {
            client_id: required("TWITCH_CLIENT_ID")?,
            client_secret: required("TWITCH_CLIENT_SECRET")?,
            bot_username: required("TWITCH_BOT_USERNAME")?.to_lowercase(),
            home_channel: required("TWITCH_CHANNEL")?.to_lowercase(),
            command_prefix: DEFAULT_COMMAND_PREFIX.to_string(),
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            shoutouts: ShoutoutSettings::default(),
            refresh: RefreshSettings::default(),
        })
    }
}
