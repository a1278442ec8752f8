// File: shoutbot-core/src/test_utils/memory.rs

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use shoutbot_common::models::{
    Channel, ChannelLiveInfo, ChannelModerator, LiveChannel, Pronoun, ShoutoutCandidate,
    ShoutoutTarget, TokenSet, TwitchUser,
};
use shoutbot_common::traits::repository_traits::{
    ChannelInfoRepository, ChannelRepository, ModeratorRepository, PronounRepository,
    ShoutoutTargetRepository, UserRepository,
};

use crate::Error;

#[derive(Default)]
struct Tables {
    channels: HashMap<String, Channel>,
    users: HashMap<String, TwitchUser>,
    targets: Vec<ShoutoutTarget>,
    moderators: HashSet<(String, String)>,
    live_info: HashMap<String, ChannelLiveInfo>,
    pronouns: HashMap<String, Pronoun>,
}

/// Every repository trait over plain maps, for tests.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_user(&self, user: TwitchUser) {
        self.tables.lock().users.insert(user.id.clone(), user);
    }

    pub fn put_channel(&self, channel: Channel) {
        self.tables.lock().channels.insert(channel.id.clone(), channel);
    }

    pub fn put_target(&self, target: ShoutoutTarget) {
        self.tables.lock().targets.push(target);
    }

    pub fn put_moderator(&self, channel_id: &str, user_id: &str) {
        self.tables
            .lock()
            .moderators
            .insert((channel_id.to_string(), user_id.to_string()));
    }

    pub fn put_live_info(&self, info: ChannelLiveInfo) {
        self.tables.lock().live_info.insert(info.broadcaster_id.clone(), info);
    }

    pub fn channel(&self, id: &str) -> Option<Channel> {
        self.tables.lock().channels.get(id).cloned()
    }

    pub fn user(&self, id: &str) -> Option<TwitchUser> {
        self.tables.lock().users.get(id).cloned()
    }

    pub fn targets_for(&self, channel_id: &str) -> Vec<ShoutoutTarget> {
        self.tables
            .lock()
            .targets
            .iter()
            .filter(|t| t.channel_id == channel_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ChannelRepository for InMemoryStore {
    async fn get_channel(&self, channel_id: &str) -> Result<Option<Channel>, Error> {
        Ok(self.channel(channel_id))
    }

    async fn get_channel_by_name(&self, name: &str) -> Result<Option<Channel>, Error> {
        let name = name.to_lowercase();
        Ok(self
            .tables
            .lock()
            .channels
            .values()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn create_channel(&self, channel: &Channel) -> Result<(), Error> {
        let mut t = self.tables.lock();
        if t.channels.contains_key(&channel.id) || t.channels.values().any(|c| c.name == channel.name) {
            return Err(Error::Validation(format!("channel {} exists", channel.name)));
        }
        t.channels.insert(channel.id.clone(), channel.clone());
        Ok(())
    }

    async fn update_channel(&self, channel: &Channel) -> Result<(), Error> {
        let mut t = self.tables.lock();
        match t.channels.get_mut(&channel.id) {
            Some(c) => {
                *c = channel.clone();
                Ok(())
            }
            None => Err(Error::NotFound(format!("channel {}", channel.id))),
        }
    }

    async fn set_channel_enabled(&self, channel_id: &str, enabled: bool) -> Result<(), Error> {
        let mut t = self.tables.lock();
        let c = t
            .channels
            .get_mut(channel_id)
            .ok_or_else(|| Error::NotFound(format!("channel {channel_id}")))?;
        c.enabled = enabled;
        Ok(())
    }

    async fn list_enabled_channels(&self) -> Result<Vec<Channel>, Error> {
        let mut out: Vec<Channel> = self
            .tables
            .lock()
            .channels
            .values()
            .filter(|c| c.enabled)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn list_live_channels_with_targets(&self) -> Result<Vec<LiveChannel>, Error> {
        let t = self.tables.lock();
        let mut out = Vec::new();
        for channel in t.channels.values().filter(|c| c.enabled) {
            let live = t.users.get(&channel.id).is_some_and(|u| u.is_live);
            if !live {
                continue;
            }
            let candidates = t
                .targets
                .iter()
                .filter(|x| x.channel_id == channel.id && x.enabled)
                .filter_map(|x| {
                    t.users.get(&x.target_user_id).map(|u| ShoutoutCandidate {
                        target: x.clone(),
                        user: u.clone(),
                        live_info: t.live_info.get(&u.id).cloned(),
                    })
                })
                .collect();
            out.push(LiveChannel {
                channel: channel.clone(),
                candidates,
            });
        }
        out.sort_by(|a, b| a.channel.name.cmp(&b.channel.name));
        Ok(out)
    }

    async fn set_channel_last_shoutout(&self, channel_id: &str, at: DateTime<Utc>) -> Result<(), Error> {
        let mut t = self.tables.lock();
        let c = t
            .channels
            .get_mut(channel_id)
            .ok_or_else(|| Error::NotFound(format!("channel {channel_id}")))?;
        c.last_shoutout_at = Some(at);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<TwitchUser>, Error> {
        Ok(self.user(user_id))
    }

    async fn get_user_by_login(&self, login: &str) -> Result<Option<TwitchUser>, Error> {
        let login = login.to_lowercase();
        Ok(self
            .tables
            .lock()
            .users
            .values()
            .find(|u| u.username == login)
            .cloned())
    }

    async fn upsert_user(&self, user: &TwitchUser) -> Result<(), Error> {
        let mut t = self.tables.lock();
        let mut incoming = user.clone();
        if let Some(existing) = t.users.get(&user.id) {
            incoming.access_token = incoming.access_token.or_else(|| existing.access_token.clone());
            incoming.refresh_token = incoming.refresh_token.or_else(|| existing.refresh_token.clone());
            incoming.token_expiry = incoming.token_expiry.or(existing.token_expiry);
            incoming.pronoun = incoming.pronoun.or_else(|| existing.pronoun.clone());
            incoming.color = incoming.color.or_else(|| existing.color.clone());
            incoming.timezone = incoming.timezone.or_else(|| existing.timezone.clone());
            incoming.created_at = existing.created_at;
        }
        t.users.insert(incoming.id.clone(), incoming);
        Ok(())
    }

    async fn update_tokens(&self, user_id: &str, tokens: &TokenSet) -> Result<(), Error> {
        let mut t = self.tables.lock();
        let u = t
            .users
            .get_mut(user_id)
            .ok_or_else(|| Error::NotFound(format!("user {user_id}")))?;
        u.access_token = Some(tokens.access_token.clone());
        u.refresh_token = Some(tokens.refresh_token.clone());
        u.token_expiry = Some(tokens.expires_at);
        Ok(())
    }

    async fn list_users_with_refresh_token(&self) -> Result<Vec<TwitchUser>, Error> {
        Ok(self
            .tables
            .lock()
            .users
            .values()
            .filter(|u| u.refresh_token.as_deref().is_some_and(|r| !r.is_empty()))
            .cloned()
            .collect())
    }

    async fn set_live(&self, user_id: &str, is_live: bool) -> Result<(), Error> {
        if let Some(u) = self.tables.lock().users.get_mut(user_id) {
            u.is_live = is_live;
        }
        Ok(())
    }
}

#[async_trait]
impl ShoutoutTargetRepository for InMemoryStore {
    async fn get_target(&self, channel_id: &str, target_user_id: &str) -> Result<Option<ShoutoutTarget>, Error> {
        Ok(self
            .tables
            .lock()
            .targets
            .iter()
            .find(|t| t.channel_id == channel_id && t.target_user_id == target_user_id)
            .cloned())
    }

    async fn list_targets(&self, channel_id: &str) -> Result<Vec<ShoutoutTarget>, Error> {
        Ok(self.targets_for(channel_id))
    }

    async fn create_target(&self, target: &ShoutoutTarget) -> Result<(), Error> {
        let mut t = self.tables.lock();
        if t.targets
            .iter()
            .any(|x| x.channel_id == target.channel_id && x.target_user_id == target.target_user_id)
        {
            return Err(Error::Validation("duplicate shoutout target".into()));
        }
        t.targets.push(target.clone());
        Ok(())
    }

    async fn delete_target(&self, channel_id: &str, target_user_id: &str) -> Result<bool, Error> {
        let mut t = self.tables.lock();
        let before = t.targets.len();
        t.targets
            .retain(|x| !(x.channel_id == channel_id && x.target_user_id == target_user_id));
        Ok(t.targets.len() != before)
    }

    async fn set_target_last_shoutout(&self, target_id: Uuid, at: DateTime<Utc>) -> Result<(), Error> {
        let mut t = self.tables.lock();
        let target = t
            .targets
            .iter_mut()
            .find(|x| x.id == target_id)
            .ok_or_else(|| Error::NotFound(format!("target {target_id}")))?;
        target.last_shoutout_at = Some(at);
        Ok(())
    }
}

#[async_trait]
impl ModeratorRepository for InMemoryStore {
    async fn is_moderator(&self, channel_id: &str, user_id: &str) -> Result<bool, Error> {
        Ok(self
            .tables
            .lock()
            .moderators
            .contains(&(channel_id.to_string(), user_id.to_string())))
    }

    async fn upsert_moderator(&self, moderator: &ChannelModerator) -> Result<(), Error> {
        self.put_moderator(&moderator.channel_id, &moderator.user_id);
        Ok(())
    }

    async fn list_moderators(&self, channel_id: &str) -> Result<Vec<ChannelModerator>, Error> {
        Ok(self
            .tables
            .lock()
            .moderators
            .iter()
            .filter(|(c, _)| c == channel_id)
            .map(|(c, u)| ChannelModerator {
                channel_id: c.clone(),
                user_id: u.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl ChannelInfoRepository for InMemoryStore {
    async fn get_live_info(&self, broadcaster_id: &str) -> Result<Option<ChannelLiveInfo>, Error> {
        Ok(self.tables.lock().live_info.get(broadcaster_id).cloned())
    }

    async fn upsert_live_info(&self, info: &ChannelLiveInfo) -> Result<(), Error> {
        self.put_live_info(info.clone());
        Ok(())
    }
}

#[async_trait]
impl PronounRepository for InMemoryStore {
    async fn upsert_pronoun(&self, pronoun: &Pronoun) -> Result<(), Error> {
        self.tables
            .lock()
            .pronouns
            .insert(pronoun.name.clone(), pronoun.clone());
        Ok(())
    }

    async fn get_pronoun(&self, name: &str) -> Result<Option<Pronoun>, Error> {
        Ok(self.tables.lock().pronouns.get(name).cloned())
    }
}
