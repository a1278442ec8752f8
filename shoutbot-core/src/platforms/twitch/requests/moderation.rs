// File: shoutbot-core/src/platforms/twitch/requests/moderation.rs

use serde::Deserialize;

use shoutbot_common::models::ChannelRef;

use crate::Error;
use crate::platforms::twitch::client::{check_status, TwitchHelixClient};

/// Response from `GET /helix/moderation/channels`.
#[derive(Debug, Deserialize)]
pub struct ModeratedChannelsResponse {
    pub data: Vec<ModeratedChannel>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub struct ModeratedChannel {
    pub broadcaster_id: String,
    pub broadcaster_login: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct Pagination {
    pub cursor: Option<String>,
}

impl TwitchHelixClient {
    /// All channels `user_id` moderates, following pagination. Needs a token
    /// belonging to `user_id` with `user:read:moderated_channels`.
    pub async fn fetch_moderated_channels(
        &self,
        user_id: &str,
        user_token: &str,
    ) -> Result<Vec<ChannelRef>, Error> {
        let mut out = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query = vec![("user_id", user_id.to_string()), ("first", "100".to_string())];
            if let Some(c) = &cursor {
                query.push(("after", c.clone()));
            }
            let resp = self
                .get_as("moderation/channels", user_token)
                .query(&query)
                .send()
                .await?;
            let resp = check_status(resp, "Get Moderated Channels").await?;
            let body: ModeratedChannelsResponse = resp.json().await?;

            out.extend(body.data.into_iter().map(|c| ChannelRef {
                broadcaster_id: c.broadcaster_id,
                broadcaster_login: c.broadcaster_login,
            }));

            match body.pagination.cursor {
                Some(c) if !c.is_empty() => cursor = Some(c),
                _ => break,
            }
        }
        Ok(out)
    }
}
