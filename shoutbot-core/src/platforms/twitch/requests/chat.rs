// File: shoutbot-core/src/platforms/twitch/requests/chat.rs

use serde::{Deserialize, Serialize};
use tracing::debug;

use shoutbot_common::models::AnnouncementColor;

use crate::Error;
use crate::platforms::twitch::client::{check_status, TwitchHelixClient};

#[derive(Debug, Serialize)]
struct AnnouncementBody<'a> {
    message: &'a str,
    color: String,
}

#[derive(Debug, Deserialize)]
struct ChatColorEntry {
    #[serde(default)]
    color: String,
}

#[derive(Debug, Deserialize)]
struct ChatColorResponse {
    data: Vec<ChatColorEntry>,
}

impl TwitchHelixClient {
    /// `GET /helix/chat/color`. An empty color string means the user never set one.
    pub async fn fetch_chat_color(&self, user_id: &str) -> Result<Option<String>, Error> {
        let resp = self.get("chat/color").query(&[("user_id", user_id)]).send().await?;
        let body: ChatColorResponse = check_status(resp, "Get User Chat Color").await?.json().await?;
        Ok(body
            .data
            .into_iter()
            .next()
            .map(|e| e.color)
            .filter(|c| !c.is_empty()))
    }

    /// `POST /helix/chat/shoutouts`. Requires `moderator:manage:shoutouts`
    /// for `moderator_id`.
    pub async fn post_shoutout(
        &self,
        from_broadcaster_id: &str,
        to_broadcaster_id: &str,
        moderator_id: &str,
    ) -> Result<(), Error> {
        let resp = self
            .post("chat/shoutouts")
            .query(&[
                ("from_broadcaster_id", from_broadcaster_id),
                ("to_broadcaster_id", to_broadcaster_id),
                ("moderator_id", moderator_id),
            ])
            .send()
            .await?;
        check_status(resp, "Send Shoutout").await?;
        debug!("Shoutout {} -> {} sent", from_broadcaster_id, to_broadcaster_id);
        Ok(())
    }

    /// `POST /helix/chat/announcements`, sent as the bot.
    pub async fn post_announcement(
        &self,
        broadcaster_id: &str,
        message: &str,
        color: AnnouncementColor,
    ) -> Result<(), Error> {
        let moderator_id = self.session().bot_user_id().to_string();
        let resp = self
            .post("chat/announcements")
            .query(&[
                ("broadcaster_id", broadcaster_id),
                ("moderator_id", moderator_id.as_str()),
            ])
            .json(&AnnouncementBody {
                message,
                color: color.to_string(),
            })
            .send()
            .await?;
        check_status(resp, "Send Chat Announcement").await?;
        Ok(())
    }
}
