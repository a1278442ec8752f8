use std::sync::Arc;

use tracing::{debug, warn};

use shoutbot_common::models::{ChannelLiveInfo, ChannelModerator, TwitchUser};
use shoutbot_common::traits::api::TwitchApi;

use crate::repositories::Repositories;
use crate::services::pronoun_service::PronounService;
use crate::Error;

pub struct UserService {
    api: Arc<dyn TwitchApi>,
    repos: Repositories,
    pronouns: Arc<PronounService>,
}

fn normalize(login_or_id: &str) -> String {
    login_or_id.trim().trim_start_matches('@').to_lowercase()
}

impl UserService {
    pub fn new(api: Arc<dyn TwitchApi>, repos: Repositories, pronouns: Arc<PronounService>) -> Self {
        Self { api, repos, pronouns }
    }

    /// Storage first, then Helix. A user fetched from Helix is stored together
    /// with their pronoun, chat color and current channel info.
    pub async fn resolve_user(&self, login_or_id: &str) -> Result<Option<TwitchUser>, Error> {
        let key = normalize(login_or_id);
        if key.is_empty() {
            return Ok(None);
        }

        let stored = if key.chars().all(|c| c.is_ascii_digit()) {
            self.repos.users.get_user(&key).await?
        } else {
            self.repos.users.get_user_by_login(&key).await?
        };
        if let Some(user) = stored {
            return Ok(Some(user));
        }

        let Some(mut user) = self.api.get_user(&key).await? else {
            debug!("Twitch has no user '{}'", key);
            return Ok(None);
        };

        user.pronoun = self.pronouns.user_pronoun(&user.username).await;
        match self.api.get_user_chat_color(&user.id).await {
            Ok(color) => user.color = color,
            Err(e) => warn!("Chat color lookup for {} failed: {}", user.username, e),
        }
        self.repos.users.upsert_user(&user).await?;
        self.refresh_live_info(&user).await;

        Ok(Some(user))
    }

    /// Makes sure a chat sender has a user row, without touching an existing one.
    pub async fn get_or_create_from_chat(
        &self,
        user_id: &str,
        login: &str,
        display_name: &str,
    ) -> Result<TwitchUser, Error> {
        if let Some(user) = self.repos.users.get_user(user_id).await? {
            return Ok(user);
        }
        let display = if display_name.is_empty() { login } else { display_name };
        let user = TwitchUser::new(user_id, login, display);
        self.repos.users.upsert_user(&user).await?;
        Ok(user)
    }

    /// Current channel info from Helix, stored on success. Falls back to the
    /// last stored copy when Helix is unavailable.
    pub async fn refresh_live_info(&self, user: &TwitchUser) -> Option<ChannelLiveInfo> {
        match self.api.fetch_channel_live_info(&user.id).await {
            Ok(Some(info)) => {
                if let Err(e) = self.repos.live_info.upsert_live_info(&info).await {
                    warn!("Storing channel info for {} failed: {}", user.username, e);
                }
                return Some(info);
            }
            Ok(None) => {}
            Err(e) => warn!("Channel info for {} unavailable: {}", user.username, e),
        }
        self.repos
            .live_info
            .get_live_info(&user.id)
            .await
            .unwrap_or_else(|e| {
                warn!("Reading cached channel info for {} failed: {}", user.username, e);
                None
            })
    }

    /// Stores a moderator row for every channel `user_id` moderates.
    pub async fn sync_moderated_channels(&self, user_id: &str, user_token: &str) -> Result<usize, Error> {
        let channels = self.api.get_moderated_channels(user_id, user_token).await?;
        for ch in &channels {
            self.repos
                .moderators
                .upsert_moderator(&ChannelModerator {
                    channel_id: ch.broadcaster_id.clone(),
                    user_id: user_id.to_string(),
                })
                .await?;
        }
        debug!("User {} moderates {} channels", user_id, channels.len());
        Ok(channels.len())
    }
}
