// File: shoutbot-core/src/services/channel_admin.rs

use std::sync::Arc;

use tracing::info;

use shoutbot_common::models::Channel;

use crate::connections::ChannelMembership;
use crate::repositories::Repositories;
use crate::services::commands::targets::{add_target, remove_target, TargetChange};
use crate::services::user_service::UserService;
use crate::Error;

/// Channel management outside of chat. Applies the same rules as the chat
/// commands and keeps the connection pool in step with the enabled flag.
pub struct ChannelAdmin {
    repos: Repositories,
    users: Arc<UserService>,
    membership: Arc<dyn ChannelMembership>,
}

impl ChannelAdmin {
    pub fn new(
        repos: Repositories,
        users: Arc<UserService>,
        membership: Arc<dyn ChannelMembership>,
    ) -> Self {
        Self { repos, users, membership }
    }

    pub async fn set_channel_enabled(&self, channel_id: &str, enabled: bool) -> Result<(), Error> {
        let channel = self.channel(channel_id).await?;
        self.repos.channels.set_channel_enabled(channel_id, enabled).await?;
        if enabled {
            self.membership.ensure_connected(&channel.name).await?;
        } else {
            self.membership.remove(&channel.name).await?;
        }
        info!("Channel #{} enabled={}", channel.name, enabled);
        Ok(())
    }

    pub async fn add_target(&self, channel_id: &str, login: &str) -> Result<TargetChange, Error> {
        let channel = self.channel(channel_id).await?;
        add_target(&self.repos, &self.users, &channel, login).await
    }

    pub async fn remove_target(&self, channel_id: &str, login: &str) -> Result<TargetChange, Error> {
        let channel = self.channel(channel_id).await?;
        remove_target(&self.repos, &channel, login).await
    }

    async fn channel(&self, channel_id: &str) -> Result<Channel, Error> {
        self.repos
            .channels
            .get_channel(channel_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("channel {channel_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connections::{JoinOutcome, MockChannelMembership};
    use crate::services::pronoun_service::PronounService;
    use crate::test_utils::{InMemoryStore, NoPronouns, RecordingTwitchApi};
    use shoutbot_common::models::TwitchUser;

    fn admin(store: Arc<InMemoryStore>, membership: MockChannelMembership) -> ChannelAdmin {
        let api = Arc::new(RecordingTwitchApi::new());
        api.add_user(TwitchUser::new("200", "bob", "Bob"));
        let repos = Repositories::from_store(store);
        let pronouns = Arc::new(PronounService::new(Arc::new(NoPronouns), repos.pronouns.clone()));
        let users = Arc::new(UserService::new(api, repos.clone(), pronouns));
        ChannelAdmin::new(repos, users, Arc::new(membership))
    }

    fn store_with_alice() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.put_user(TwitchUser::new("100", "alice", "Alice"));
        store.put_channel(Channel::new("100", "alice"));
        store
    }

    #[tokio::test]
    async fn enabled_flag_drives_membership() {
        let store = store_with_alice();
        let mut membership = MockChannelMembership::new();
        membership.expect_remove().times(1).returning(|ch| match ch {
            "alice" => Ok(true),
            other => Err(Error::Chat(format!("unexpected #{other}"))),
        });
        membership
            .expect_ensure_connected()
            .times(1)
            .returning(|_| Ok(JoinOutcome::NewlyConnected));
        let admin = admin(store.clone(), membership);

        admin.set_channel_enabled("100", false).await.unwrap();
        assert!(!store.channel("100").unwrap().enabled);
        admin.set_channel_enabled("100", true).await.unwrap();
        assert!(store.channel("100").unwrap().enabled);
    }

    #[tokio::test]
    async fn unknown_channel_is_not_found() {
        let admin = admin(store_with_alice(), MockChannelMembership::new());
        let err = admin.set_channel_enabled("555", true).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn targets_follow_chat_rules() {
        let store = store_with_alice();
        let admin = admin(store.clone(), MockChannelMembership::new());

        assert_eq!(admin.add_target("100", "@Bob").await.unwrap(), TargetChange::Added);
        assert_eq!(admin.add_target("100", "bob").await.unwrap(), TargetChange::AlreadyExists);
        assert_eq!(admin.add_target("100", "alice").await.unwrap(), TargetChange::SelfShoutout);
        assert_eq!(store.targets_for("100").len(), 1);
        assert_eq!(admin.remove_target("100", "bob").await.unwrap(), TargetChange::Removed);
        assert_eq!(admin.remove_target("100", "bob").await.unwrap(), TargetChange::NotATarget);
    }
}
