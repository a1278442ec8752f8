// File: shoutbot-core/tests/test_utils/mod.rs
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use shoutbot_common::models::{Channel, ChannelLiveInfo, TokenSet, TwitchUser};
use shoutbot_core::auth::BotSession;
use shoutbot_core::platforms::{ChatMessage, SenderRoles};
use shoutbot_core::repositories::Repositories;
use shoutbot_core::services::{
    CommandParser, CommandRouter, CooldownTracker, PronounService, ShoutoutService, UserService,
};
use shoutbot_core::test_utils::{InMemoryStore, NoPronouns, RecordingChat, RecordingTwitchApi};

pub const BOT_ID: &str = "999";
pub const ALICE: &str = "100";
pub const BOB: &str = "200";
pub const CAROL: &str = "300";
pub const DAVE: &str = "400";

pub fn user(id: &str, login: &str, display: &str) -> TwitchUser {
    TwitchUser::new(id, login, display)
}

pub fn live_info(broadcaster_id: &str, game: &str, title: &str) -> ChannelLiveInfo {
    ChannelLiveInfo {
        broadcaster_id: broadcaster_id.into(),
        game_name: Some(game.into()),
        title: Some(title.into()),
        ..Default::default()
    }
}

pub fn bot_session() -> Arc<BotSession> {
    Arc::new(BotSession::new(
        "cid",
        BOT_ID,
        "shoutbot",
        TokenSet {
            access_token: "bot-access".into(),
            refresh_token: "bot-refresh".into(),
            expires_at: Utc::now() + chrono::Duration::hours(4),
        },
    ))
}

/// Channel alice (broadcaster), carol moderates it, bob is a streamer
/// known to Helix, dave is a viewer.
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub api: Arc<RecordingTwitchApi>,
    pub chat: Arc<RecordingChat>,
    pub repos: Repositories,
    pub session: Arc<BotSession>,
    pub cooldowns: Arc<CooldownTracker>,
    pub users: Arc<UserService>,
    pub shoutouts: Arc<ShoutoutService>,
    pub router: CommandRouter,
    pub parser: CommandParser,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let api = Arc::new(RecordingTwitchApi::new());
        let chat = Arc::new(RecordingChat::default());
        let repos = Repositories::from_store(store.clone());
        let session = bot_session();

        let mut alice = user(ALICE, "alice", "Alice");
        alice.is_live = true;
        store.put_user(alice.clone());
        store.put_user(user(CAROL, "carol", "Carol"));
        store.put_channel(Channel::new(ALICE, "alice"));
        store.put_moderator(ALICE, CAROL);

        let mut bob = user(BOB, "bob", "Bob");
        bob.is_live = true;
        api.add_user(alice);
        api.add_user(bob);
        api.add_user(user(DAVE, "dave", "Dave"));
        api.set_live_info(live_info(BOB, "Celeste", "any% practice"));

        let cooldowns = Arc::new(CooldownTracker::new(
            Duration::from_secs(120),
            Duration::from_secs(3600),
        ));
        let pronouns = Arc::new(PronounService::new(Arc::new(NoPronouns), repos.pronouns.clone()));
        let users = Arc::new(UserService::new(api.clone(), repos.clone(), pronouns));
        let shoutouts = Arc::new(ShoutoutService::new(
            api.clone(),
            cooldowns.clone(),
            repos.clone(),
            session.clone(),
        ));
        let router = CommandRouter::new(
            repos.clone(),
            users.clone(),
            shoutouts.clone(),
            chat.clone(),
            chat.clone(),
            "?",
        );

        Self {
            store,
            api,
            chat,
            repos,
            session,
            cooldowns,
            users,
            shoutouts,
            router,
            parser: CommandParser::new("?"),
        }
    }

    /// Runs `text` as if `login` typed it in `channel`; returns the reply.
    pub async fn say(&self, channel: &str, room_id: &str, user_id: &str, login: &str, text: &str) -> Option<String> {
        let message = chat_message(channel, room_id, user_id, login, text);
        let command = self.parser.parse(&message.text, message.roles)?;
        self.router
            .execute(&command, &message)
            .await
            .expect("command should not error")
    }

    /// Shorthand for chatting in alice's channel.
    pub async fn in_alice(&self, user_id: &str, login: &str, text: &str) -> Option<String> {
        self.say("alice", ALICE, user_id, login, text).await
    }
}

pub fn chat_message(channel: &str, room_id: &str, user_id: &str, login: &str, text: &str) -> ChatMessage {
    ChatMessage {
        channel: channel.into(),
        room_id: room_id.into(),
        user_id: user_id.into(),
        login: login.into(),
        display_name: login.into(),
        text: text.into(),
        roles: SenderRoles::default(),
    }
}
