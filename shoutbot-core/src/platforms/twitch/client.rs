// File: shoutbot-core/src/platforms/twitch/client.rs

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, RequestBuilder, Response};
use serde::Deserialize;
use tracing::warn;

use shoutbot_common::models::{AnnouncementColor, ChannelLiveInfo, ChannelRef, LiveStream, TwitchUser};
use shoutbot_common::traits::api::TwitchApi;

use crate::auth::BotSession;
use crate::Error;

pub const HELIX_BASE_URL: &str = "https://api.twitch.tv/helix";

/// Entry point for all Helix calls. Every request carries the client id and
/// the bot's current bearer token, read from the shared session at send time.
pub struct TwitchHelixClient {
    http: ReqwestClient,
    session: Arc<BotSession>,
    base_url: String,
}

/// Error body Helix returns alongside non-2xx statuses.
#[derive(Debug, Deserialize)]
struct HelixErrorBody {
    #[serde(default)]
    message: String,
}

impl TwitchHelixClient {
    /// `timeout` bounds every request made through this client.
    pub fn new(session: Arc<BotSession>, timeout: Duration) -> Result<Self, Error> {
        let http = ReqwestClient::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            session,
            base_url: HELIX_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn session(&self) -> &Arc<BotSession> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET authenticated as the bot.
    pub(crate) fn get(&self, path: &str) -> RequestBuilder {
        self.get_as(path, &self.session.access_token())
    }

    /// GET authenticated with someone else's token.
    pub(crate) fn get_as(&self, path: &str, bearer: &str) -> RequestBuilder {
        self.http
            .get(self.url(path))
            .header("Client-Id", self.session.client_id())
            .header("Authorization", format!("Bearer {}", bearer))
    }

    pub(crate) fn post(&self, path: &str) -> RequestBuilder {
        self.http
            .post(self.url(path))
            .header("Client-Id", self.session.client_id())
            .header("Authorization", format!("Bearer {}", self.session.access_token()))
    }
}

/// Passes successful responses through and turns everything else into
/// `Error::TwitchApi` carrying Twitch's own message.
pub(crate) async fn check_status(resp: Response, context: &str) -> Result<Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<HelixErrorBody>(&body)
        .ok()
        .map(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    warn!("{} => HTTP {} => {}", context, status, body);
    Err(Error::TwitchApi {
        status: status.as_u16(),
        message,
    })
}

/// Helix accepts between 1 and 100 ids per lookup.
pub(crate) fn check_id_batch(ids: &[String]) -> Result<(), Error> {
    if ids.is_empty() || ids.len() > 100 {
        return Err(Error::Validation(format!(
            "expected between 1 and 100 ids, got {}",
            ids.len()
        )));
    }
    Ok(())
}

#[async_trait]
impl TwitchApi for TwitchHelixClient {
    async fn get_user(&self, id_or_login: &str) -> Result<Option<TwitchUser>, Error> {
        self.fetch_user(id_or_login).await
    }

    async fn get_users(&self, ids: &[String]) -> Result<Vec<TwitchUser>, Error> {
        self.fetch_users_by_id(ids).await
    }

    async fn get_live_streams(&self, user_ids: &[String]) -> Result<Vec<LiveStream>, Error> {
        self.fetch_live_streams(user_ids).await
    }

    async fn fetch_channel_live_info(
        &self,
        broadcaster_id: &str,
    ) -> Result<Option<ChannelLiveInfo>, Error> {
        self.fetch_channel_information(broadcaster_id).await
    }

    async fn send_shoutout(
        &self,
        from_broadcaster_id: &str,
        to_broadcaster_id: &str,
        moderator_id: &str,
    ) -> Result<(), Error> {
        self.post_shoutout(from_broadcaster_id, to_broadcaster_id, moderator_id).await
    }

    async fn send_announcement(
        &self,
        broadcaster_id: &str,
        message: &str,
        color: AnnouncementColor,
    ) -> Result<(), Error> {
        self.post_announcement(broadcaster_id, message, color).await
    }

    async fn get_user_chat_color(&self, user_id: &str) -> Result<Option<String>, Error> {
        self.fetch_chat_color(user_id).await
    }

    async fn get_moderated_channels(
        &self,
        user_id: &str,
        user_token: &str,
    ) -> Result<Vec<ChannelRef>, Error> {
        self.fetch_moderated_channels(user_id, user_token).await
    }
}
