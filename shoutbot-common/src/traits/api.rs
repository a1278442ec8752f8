use async_trait::async_trait;

use crate::error::Error;
use crate::models::{AnnouncementColor, ChannelLiveInfo, ChannelRef, LiveStream, Pronoun, TwitchUser};

/// Helix operations the bot relies on. Calls authenticate as the bot unless a
/// token is passed explicitly.
#[async_trait]
pub trait TwitchApi: Send + Sync {
    /// `id_or_login` is treated as an id when it is all digits.
    async fn get_user(&self, id_or_login: &str) -> Result<Option<TwitchUser>, Error>;

    /// Accepts 1..=100 ids.
    async fn get_users(&self, ids: &[String]) -> Result<Vec<TwitchUser>, Error>;

    /// Accepts 1..=100 ids. Returns only the broadcasters currently live.
    async fn get_live_streams(&self, user_ids: &[String]) -> Result<Vec<LiveStream>, Error>;

    async fn fetch_channel_live_info(
        &self,
        broadcaster_id: &str,
    ) -> Result<Option<ChannelLiveInfo>, Error>;

    async fn send_shoutout(
        &self,
        from_broadcaster_id: &str,
        to_broadcaster_id: &str,
        moderator_id: &str,
    ) -> Result<(), Error>;

    async fn send_announcement(
        &self,
        broadcaster_id: &str,
        message: &str,
        color: AnnouncementColor,
    ) -> Result<(), Error>;

    /// Chat name color (`#RRGGBB`), `None` when the user never picked one.
    async fn get_user_chat_color(&self, user_id: &str) -> Result<Option<String>, Error>;

    /// Channels where `user_id` is a moderator. Needs that user's own token.
    async fn get_moderated_channels(
        &self,
        user_id: &str,
        user_token: &str,
    ) -> Result<Vec<ChannelRef>, Error>;
}

/// Public pronoun catalog lookup.
#[async_trait]
pub trait PronounApi: Send + Sync {
    async fn list_pronouns(&self) -> Result<Vec<Pronoun>, Error>;

    /// Pronoun key (`Pronoun::name`) chosen by `login`, if any.
    async fn user_pronoun_id(&self, login: &str) -> Result<Option<String>, Error>;
}
