use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::channel::{Channel, ChannelLiveInfo};
use crate::models::user::TwitchUser;

/// One auto-shoutout entry: `target_user_id` gets shouted out in
/// `channel_id`. Unique per (channel_id, target_user_id).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, sqlx::FromRow)]
pub struct ShoutoutTarget {
    pub id: Uuid,
    pub channel_id: String,
    pub target_user_id: String,
    pub message_template: Option<String>,
    pub enabled: bool,
    pub last_shoutout_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ShoutoutTarget {
    pub fn new(channel_id: &str, target_user_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel_id: channel_id.to_string(),
            target_user_id: target_user_id.to_string(),
            message_template: None,
            enabled: true,
            last_shoutout_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn window_elapsed(&self, window: Duration, now: DateTime<Utc>) -> bool {
        match self.last_shoutout_at {
            None => true,
            Some(last) => now - last >= window,
        }
    }
}

/// A shoutout target joined with what is needed to render its message.
#[derive(Debug, Clone)]
pub struct ShoutoutCandidate {
    pub target: ShoutoutTarget,
    pub user: TwitchUser,
    pub live_info: Option<ChannelLiveInfo>,
}

/// An enabled channel whose broadcaster is live, with its enabled targets.
#[derive(Debug, Clone)]
pub struct LiveChannel {
    pub channel: Channel,
    pub candidates: Vec<ShoutoutCandidate>,
}

/// Entry of a Helix `streams` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveStream {
    pub user_id: String,
    pub user_login: String,
    pub game_name: String,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnouncementColor {
    Blue,
    Green,
    Orange,
    Purple,
    Primary,
}

impl AnnouncementColor {
    pub const ALL: [AnnouncementColor; 5] = [
        AnnouncementColor::Blue,
        AnnouncementColor::Green,
        AnnouncementColor::Orange,
        AnnouncementColor::Purple,
        AnnouncementColor::Primary,
    ];
}

impl fmt::Display for AnnouncementColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnouncementColor::Blue => write!(f, "blue"),
            AnnouncementColor::Green => write!(f, "green"),
            AnnouncementColor::Orange => write!(f, "orange"),
            AnnouncementColor::Purple => write!(f, "purple"),
            AnnouncementColor::Primary => write!(f, "primary"),
        }
    }
}

impl FromStr for AnnouncementColor {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "blue" => Ok(AnnouncementColor::Blue),
            "green" => Ok(AnnouncementColor::Green),
            "orange" => Ok(AnnouncementColor::Orange),
            "purple" => Ok(AnnouncementColor::Purple),
            "primary" => Ok(AnnouncementColor::Primary),
            _ => Err(format!("Unknown announcement color: {}", s)),
        }
    }
}
