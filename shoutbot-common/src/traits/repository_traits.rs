use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Error;
use crate::models::{
    Channel, ChannelLiveInfo, ChannelModerator, LiveChannel, Pronoun, ShoutoutTarget, TokenSet,
    TwitchUser,
};

#[async_trait]
pub trait ChannelRepository: Send + Sync {
    async fn get_channel(&self, channel_id: &str) -> Result<Option<Channel>, Error>;
    async fn get_channel_by_name(&self, name: &str) -> Result<Option<Channel>, Error>;
    async fn create_channel(&self, channel: &Channel) -> Result<(), Error>;
    async fn update_channel(&self, channel: &Channel) -> Result<(), Error>;
    async fn set_channel_enabled(&self, channel_id: &str, enabled: bool) -> Result<(), Error>;
    async fn list_enabled_channels(&self) -> Result<Vec<Channel>, Error>;

    /// Enabled channels whose broadcaster is live, each with its enabled
    /// targets and their users/live info.
    async fn list_live_channels_with_targets(&self) -> Result<Vec<LiveChannel>, Error>;

    async fn set_channel_last_shoutout(
        &self,
        channel_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), Error>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<TwitchUser>, Error>;
    async fn get_user_by_login(&self, login: &str) -> Result<Option<TwitchUser>, Error>;

    /// Inserts or updates profile fields keyed on `id`. Credential columns are
    /// left untouched when the incoming user carries none.
    async fn upsert_user(&self, user: &TwitchUser) -> Result<(), Error>;

    async fn update_tokens(&self, user_id: &str, tokens: &TokenSet) -> Result<(), Error>;
    async fn list_users_with_refresh_token(&self) -> Result<Vec<TwitchUser>, Error>;
    async fn set_live(&self, user_id: &str, is_live: bool) -> Result<(), Error>;
}

#[async_trait]
pub trait ShoutoutTargetRepository: Send + Sync {
    async fn get_target(
        &self,
        channel_id: &str,
        target_user_id: &str,
    ) -> Result<Option<ShoutoutTarget>, Error>;
    async fn list_targets(&self, channel_id: &str) -> Result<Vec<ShoutoutTarget>, Error>;
    async fn create_target(&self, target: &ShoutoutTarget) -> Result<(), Error>;

    /// Returns true when a row was deleted.
    async fn delete_target(&self, channel_id: &str, target_user_id: &str) -> Result<bool, Error>;

    async fn set_target_last_shoutout(&self, target_id: Uuid, at: DateTime<Utc>) -> Result<(), Error>;
}

#[async_trait]
pub trait ModeratorRepository: Send + Sync {
    async fn is_moderator(&self, channel_id: &str, user_id: &str) -> Result<bool, Error>;
    async fn upsert_moderator(&self, moderator: &ChannelModerator) -> Result<(), Error>;
    async fn list_moderators(&self, channel_id: &str) -> Result<Vec<ChannelModerator>, Error>;
}

#[async_trait]
pub trait ChannelInfoRepository: Send + Sync {
    async fn get_live_info(&self, broadcaster_id: &str) -> Result<Option<ChannelLiveInfo>, Error>;
    async fn upsert_live_info(&self, info: &ChannelLiveInfo) -> Result<(), Error>;
}

#[async_trait]
pub trait PronounRepository: Send + Sync {
    async fn upsert_pronoun(&self, pronoun: &Pronoun) -> Result<(), Error>;
    async fn get_pronoun(&self, name: &str) -> Result<Option<Pronoun>, Error>;
}

/// All storage seams in one bundle, for components that need several.
pub trait ShoutoutStore:
    ChannelRepository
    + UserRepository
    + ShoutoutTargetRepository
    + ModeratorRepository
    + ChannelInfoRepository
    + PronounRepository
{
}

impl<T> ShoutoutStore for T
where
    T: ChannelRepository
        + UserRepository
        + ShoutoutTargetRepository
        + ModeratorRepository
        + ChannelInfoRepository
        + PronounRepository,
{
    // marker
}
