// ========================================================
// File: shoutbot-core/src/platforms/twitch/requests/users.rs
// ========================================================
use serde::Deserialize;
use tracing::debug;

use shoutbot_common::models::TwitchUser;

use crate::Error;
use crate::platforms::twitch::client::{check_id_batch, check_status, TwitchHelixClient};

/// Response from "Get Users" endpoint.
#[derive(Debug, Deserialize)]
pub struct UsersResponse {
    pub data: Vec<UserData>,
}

#[derive(Debug, Deserialize)]
pub struct UserData {
    pub id: String,
    pub login: String,
    pub display_name: String,
    #[serde(default)]
    pub broadcaster_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub profile_image_url: String,
    #[serde(default)]
    pub offline_image_url: String,
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

impl From<UserData> for TwitchUser {
    fn from(d: UserData) -> Self {
        let mut user = TwitchUser::new(&d.id, &d.login, &d.display_name);
        user.broadcaster_type = non_empty(d.broadcaster_type);
        user.description = non_empty(d.description);
        user.profile_image_url = non_empty(d.profile_image_url);
        user.offline_image_url = non_empty(d.offline_image_url);
        user
    }
}

impl TwitchHelixClient {
    /// Looks a user up by id when the value is all digits, by login otherwise.
    pub async fn fetch_user(&self, id_or_login: &str) -> Result<Option<TwitchUser>, Error> {
        let value = id_or_login.trim().trim_start_matches('@');
        if value.is_empty() {
            return Ok(None);
        }
        let key = if value.chars().all(|c| c.is_ascii_digit()) { "id" } else { "login" };

        let resp = self
            .get("users")
            .query(&[(key, value.to_lowercase())])
            .send()
            .await?;
        let resp = check_status(resp, "Get Users").await?;
        let body: UsersResponse = resp.json().await?;
        debug!("Get Users {}={} => {} result(s)", key, value, body.data.len());
        Ok(body.data.into_iter().next().map(TwitchUser::from))
    }

    pub async fn fetch_users_by_id(&self, ids: &[String]) -> Result<Vec<TwitchUser>, Error> {
        check_id_batch(ids)?;
        let query: Vec<(&str, &str)> = ids.iter().map(|id| ("id", id.as_str())).collect();
        let resp = self.get("users").query(&query).send().await?;
        let resp = check_status(resp, "Get Users").await?;
        let body: UsersResponse = resp.json().await?;
        Ok(body.data.into_iter().map(TwitchUser::from).collect())
    }
}
