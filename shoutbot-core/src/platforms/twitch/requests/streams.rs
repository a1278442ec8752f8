// File: shoutbot-core/src/platforms/twitch/requests/streams.rs

use serde::Deserialize;

use shoutbot_common::models::LiveStream;

use crate::Error;
use crate::platforms::twitch::client::{check_id_batch, check_status, TwitchHelixClient};

/// Response from "Get Streams" endpoint.
#[derive(Debug, Deserialize)]
pub struct StreamsResponse {
    pub data: Vec<StreamData>,
}

#[derive(Debug, Deserialize)]
pub struct StreamData {
    pub user_id: String,
    pub user_login: String,
    #[serde(default)]
    pub game_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub type_field: String,
}

impl TwitchHelixClient {
    /// Streams that are currently live among `user_ids`.
    pub async fn fetch_live_streams(&self, user_ids: &[String]) -> Result<Vec<LiveStream>, Error> {
        check_id_batch(user_ids)?;
        let mut query: Vec<(&str, &str)> = user_ids.iter().map(|id| ("user_id", id.as_str())).collect();
        query.push(("first", "100"));

        let resp = self.get("streams").query(&query).send().await?;
        let resp = check_status(resp, "Get Streams").await?;
        let body: StreamsResponse = resp.json().await?;
        Ok(body
            .data
            .into_iter()
            .filter(|s| s.type_field.is_empty() || s.type_field == "live")
            .map(|s| LiveStream {
                user_id: s.user_id,
                user_login: s.user_login,
                game_name: s.game_name,
                title: s.title,
            })
            .collect())
    }
}
