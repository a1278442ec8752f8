// File: shoutbot-core/src/platforms/twitch/requests/channels.rs

use chrono::Utc;
use serde::Deserialize;

use shoutbot_common::models::ChannelLiveInfo;

use crate::Error;
use crate::platforms::twitch::client::{check_status, TwitchHelixClient};

/// Response from `GET /helix/channels`.
#[derive(Debug, Deserialize)]
pub struct ChannelInformationResponse {
    pub data: Vec<ChannelInformation>,
}

#[derive(Debug, Deserialize)]
pub struct ChannelInformation {
    pub broadcaster_id: String,
    #[serde(default)]
    pub broadcaster_language: String,
    #[serde(default)]
    pub game_id: String,
    #[serde(default)]
    pub game_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<ChannelInformation> for ChannelLiveInfo {
    fn from(c: ChannelInformation) -> Self {
        let opt = |s: String| if s.is_empty() { None } else { Some(s) };
        ChannelLiveInfo {
            broadcaster_id: c.broadcaster_id,
            language: opt(c.broadcaster_language),
            game_id: opt(c.game_id),
            game_name: opt(c.game_name),
            title: opt(c.title),
            tags: c.tags,
            updated_at: Some(Utc::now()),
        }
    }
}

impl TwitchHelixClient {
    pub async fn fetch_channel_information(
        &self,
        broadcaster_id: &str,
    ) -> Result<Option<ChannelLiveInfo>, Error> {
        let resp = self
            .get("channels")
            .query(&[("broadcaster_id", broadcaster_id)])
            .send()
            .await?;
        let resp = check_status(resp, "Get Channel Information").await?;
        let body: ChannelInformationResponse = resp.json().await?;
        Ok(body.data.into_iter().next().map(ChannelLiveInfo::from))
    }
}
