use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SHOUTOUT_TEMPLATE: &str =
    "Check out @{name}! {subject} {tense} streaming {game}: {title}. Go give {object} a follow!";

pub const DEFAULT_SHOUTOUT_INTERVAL_MINUTES: i32 = 10;

/// A chat room the bot may sit in. `id` is the broadcaster's Twitch user id,
/// `name` their login.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, sqlx::FromRow)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub shoutout_template: String,
    pub shoutout_interval_minutes: i32,
    pub last_shoutout_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Channel {
    pub fn new(id: &str, name: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            name: name.to_lowercase(),
            enabled: true,
            shoutout_template: DEFAULT_SHOUTOUT_TEMPLATE.to_string(),
            shoutout_interval_minutes: DEFAULT_SHOUTOUT_INTERVAL_MINUTES,
            last_shoutout_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn shoutout_interval(&self) -> Duration {
        Duration::minutes(i64::from(self.shoutout_interval_minutes.max(0)))
    }

    /// Whether the persisted channel-level interval has elapsed at `now`.
    pub fn interval_elapsed(&self, now: DateTime<Utc>) -> bool {
        match self.last_shoutout_at {
            None => true,
            Some(last) => now - last >= self.shoutout_interval(),
        }
    }
}

/// Current stream metadata for a broadcaster, as reported by Helix `channels`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ChannelLiveInfo {
    pub broadcaster_id: String,
    pub language: Option<String>,
    pub game_id: Option<String>,
    pub game_name: Option<String>,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ChannelLiveInfo {
    /// True when both game and title are known and non-blank.
    pub fn has_stream_details(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.game_name) && present(&self.title)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash, sqlx::FromRow)]
pub struct ChannelModerator {
    pub channel_id: String,
    pub user_id: String,
}

/// A channel the user moderates, from Helix `moderation/channels`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    pub broadcaster_id: String,
    pub broadcaster_login: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_gate() {
        let mut ch = Channel::new("1", "Alice");
        assert_eq!(ch.name, "alice");
        let now = Utc::now();
        assert!(ch.interval_elapsed(now));

        ch.last_shoutout_at = Some(now - Duration::minutes(5));
        assert!(!ch.interval_elapsed(now));

        ch.last_shoutout_at = Some(now - Duration::minutes(10));
        assert!(ch.interval_elapsed(now));
    }

    #[test]
    fn blank_title_is_not_stream_details() {
        let info = ChannelLiveInfo {
            game_name: Some("Celeste".into()),
            title: Some("  ".into()),
            ..Default::default()
        };
        assert!(!info.has_stream_details());
    }
}
