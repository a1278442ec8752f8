// File: shoutbot-core/src/test_utils/fakes.rs
//
// Stand-ins for Twitch: a Helix API that records what it was asked to do and
// a chat connector whose connections live in memory.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use shoutbot_common::models::{
    AnnouncementColor, ChannelLiveInfo, ChannelRef, LiveStream, Pronoun, TwitchUser,
};
use shoutbot_common::traits::api::{PronounApi, TwitchApi};

use crate::connections::{ChannelMembership, ChatEventHandler, ChatOutbound, JoinOutcome};
use crate::platforms::{
    ChatConnector, ChatCredentials, ChatEvent, ChatLink, ChatMessage, ChatTransport, SenderRoles,
};
use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentShoutout {
    pub from: String,
    pub to: String,
    pub moderator: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentAnnouncement {
    pub broadcaster_id: String,
    pub message: String,
    pub color: AnnouncementColor,
}

#[derive(Default)]
struct ApiState {
    users: HashMap<String, TwitchUser>,
    live_info: HashMap<String, ChannelLiveInfo>,
    live: HashSet<String>,
    moderated: HashMap<String, Vec<ChannelRef>>,
    shoutouts: Vec<SentShoutout>,
    announcements: Vec<SentAnnouncement>,
    shoutout_failure: Option<(u16, String)>,
    user_lookup_failure: Option<(u16, String)>,
}

/// In-memory Helix.
#[derive(Default)]
pub struct RecordingTwitchApi {
    state: Mutex<ApiState>,
    shoutout_delay: Mutex<Option<Duration>>,
}

impl RecordingTwitchApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: TwitchUser) {
        self.state.lock().users.insert(user.id.clone(), user);
    }

    pub fn set_live_info(&self, info: ChannelLiveInfo) {
        self.state.lock().live_info.insert(info.broadcaster_id.clone(), info);
    }

    pub fn set_live(&self, user_id: &str, live: bool) {
        let mut s = self.state.lock();
        if live {
            s.live.insert(user_id.to_string());
        } else {
            s.live.remove(user_id);
        }
    }

    pub fn set_moderated(&self, user_id: &str, channels: Vec<ChannelRef>) {
        self.state.lock().moderated.insert(user_id.to_string(), channels);
    }

    /// Every following `send_shoutout` fails with this Helix status/message.
    pub fn fail_shoutouts(&self, status: u16, message: &str) {
        self.state.lock().shoutout_failure = Some((status, message.to_string()));
    }

    /// Every following `get_user` fails with this Helix status/message.
    pub fn fail_user_lookups(&self, status: u16, message: &str) {
        self.state.lock().user_lookup_failure = Some((status, message.to_string()));
    }

    /// Holds every `send_shoutout` for `delay` before answering.
    pub fn delay_shoutouts(&self, delay: Duration) {
        *self.shoutout_delay.lock() = Some(delay);
    }

    pub fn shoutouts(&self) -> Vec<SentShoutout> {
        self.state.lock().shoutouts.clone()
    }

    pub fn announcements(&self) -> Vec<SentAnnouncement> {
        self.state.lock().announcements.clone()
    }
}

#[async_trait]
impl TwitchApi for RecordingTwitchApi {
    async fn get_user(&self, id_or_login: &str) -> Result<Option<TwitchUser>, Error> {
        let s = self.state.lock();
        if let Some((status, message)) = s.user_lookup_failure.clone() {
            return Err(Error::TwitchApi { status, message });
        }
        if id_or_login.chars().all(|c| c.is_ascii_digit()) {
            return Ok(s.users.get(id_or_login).cloned());
        }
        let login = id_or_login.to_lowercase();
        Ok(s.users.values().find(|u| u.username == login).cloned())
    }

    async fn get_users(&self, ids: &[String]) -> Result<Vec<TwitchUser>, Error> {
        let s = self.state.lock();
        Ok(ids.iter().filter_map(|id| s.users.get(id).cloned()).collect())
    }

    async fn get_live_streams(&self, user_ids: &[String]) -> Result<Vec<LiveStream>, Error> {
        let s = self.state.lock();
        Ok(user_ids
            .iter()
            .filter(|id| s.live.contains(*id))
            .map(|id| {
                let info = s.live_info.get(id);
                LiveStream {
                    user_id: id.clone(),
                    user_login: s.users.get(id).map(|u| u.username.clone()).unwrap_or_default(),
                    game_name: info.and_then(|i| i.game_name.clone()).unwrap_or_default(),
                    title: info.and_then(|i| i.title.clone()).unwrap_or_default(),
                }
            })
            .collect())
    }

    async fn fetch_channel_live_info(&self, broadcaster_id: &str) -> Result<Option<ChannelLiveInfo>, Error> {
        Ok(self.state.lock().live_info.get(broadcaster_id).cloned())
    }

    async fn send_shoutout(
        &self,
        from_broadcaster_id: &str,
        to_broadcaster_id: &str,
        moderator_id: &str,
    ) -> Result<(), Error> {
        let delay = *self.shoutout_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut s = self.state.lock();
        if let Some((status, message)) = s.shoutout_failure.clone() {
            return Err(Error::TwitchApi { status, message });
        }
        s.shoutouts.push(SentShoutout {
            from: from_broadcaster_id.to_string(),
            to: to_broadcaster_id.to_string(),
            moderator: moderator_id.to_string(),
        });
        Ok(())
    }

    async fn send_announcement(
        &self,
        broadcaster_id: &str,
        message: &str,
        color: AnnouncementColor,
    ) -> Result<(), Error> {
        self.state.lock().announcements.push(SentAnnouncement {
            broadcaster_id: broadcaster_id.to_string(),
            message: message.to_string(),
            color,
        });
        Ok(())
    }

    async fn get_user_chat_color(&self, user_id: &str) -> Result<Option<String>, Error> {
        Ok(self.state.lock().users.get(user_id).and_then(|u| u.color.clone()))
    }

    async fn get_moderated_channels(&self, user_id: &str, _user_token: &str) -> Result<Vec<ChannelRef>, Error> {
        Ok(self.state.lock().moderated.get(user_id).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
struct ChannelRecord {
    opens: usize,
    closes: usize,
    last_token: Option<String>,
    sent: Vec<String>,
    fail_open: bool,
    fail_send: bool,
    events: Option<mpsc::Sender<ChatEvent>>,
}

type Records = Arc<Mutex<HashMap<String, ChannelRecord>>>;

/// Chat connector whose connections never leave the process. Each open link
/// reports `Connected` straight away.
#[derive(Default)]
pub struct FakeChatConnector {
    records: Records,
}

impl FakeChatConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_channel(&self, channel: &str) {
        self.records.lock().entry(channel.to_string()).or_default().fail_open = true;
    }

    pub fn fail_sends(&self, channel: &str) {
        self.records.lock().entry(channel.to_string()).or_default().fail_send = true;
    }

    pub fn open_count(&self, channel: &str) -> usize {
        self.records.lock().get(channel).map_or(0, |r| r.opens)
    }

    pub fn close_count(&self, channel: &str) -> usize {
        self.records.lock().get(channel).map_or(0, |r| r.closes)
    }

    pub fn last_token(&self, channel: &str) -> Option<String> {
        self.records.lock().get(channel).and_then(|r| r.last_token.clone())
    }

    pub fn sent(&self, channel: &str) -> Vec<String> {
        self.records.lock().get(channel).map(|r| r.sent.clone()).unwrap_or_default()
    }

    /// Delivers an event on the channel's most recent link.
    pub async fn push_event(&self, channel: &str, event: ChatEvent) {
        let tx = self.records.lock().get(channel).and_then(|r| r.events.clone());
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }

    /// A plain viewer message; ids are derived from the names.
    pub async fn push_message(&self, channel: &str, login: &str, text: &str) {
        let msg = ChatMessage {
            channel: channel.to_string(),
            room_id: channel.to_string(),
            user_id: login.to_string(),
            login: login.to_string(),
            display_name: login.to_string(),
            text: text.to_string(),
            roles: SenderRoles::default(),
        };
        self.push_event(channel, ChatEvent::Message(msg)).await;
    }
}

struct FakeTransport {
    channel: String,
    records: Records,
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn send_privmsg(&self, channel: &str, text: &str) -> Result<(), Error> {
        let mut records = self.records.lock();
        let rec = records.entry(self.channel.clone()).or_default();
        if rec.fail_send {
            return Err(Error::Chat(format!("send to #{channel} refused")));
        }
        rec.sent.push(text.to_string());
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        self.records.lock().entry(self.channel.clone()).or_default().closes += 1;
        Ok(())
    }
}

#[async_trait]
impl ChatConnector for FakeChatConnector {
    async fn open(&self, channel: &str, credentials: &ChatCredentials) -> Result<ChatLink, Error> {
        let (tx, rx) = mpsc::channel(256);
        {
            let mut records = self.records.lock();
            let rec = records.entry(channel.to_string()).or_default();
            if rec.fail_open {
                return Err(Error::Chat(format!("cannot reach #{channel}")));
            }
            rec.opens += 1;
            rec.last_token = Some(credentials.oauth_token.clone());
            rec.events = Some(tx.clone());
        }
        let _ = tx.try_send(ChatEvent::Connected);
        Ok(ChatLink {
            transport: Box::new(FakeTransport {
                channel: channel.to_string(),
                records: Arc::clone(&self.records),
            }),
            events: rx,
        })
    }
}

/// Remembers every message a session handed over.
#[derive(Default)]
pub struct RecordingHandler {
    seen: Mutex<Vec<ChatMessage>>,
}

impl RecordingHandler {
    pub fn texts(&self) -> Vec<String> {
        self.seen.lock().iter().map(|m| m.text.clone()).collect()
    }
}

#[async_trait]
impl ChatEventHandler for RecordingHandler {
    async fn on_message(&self, message: ChatMessage) {
        self.seen.lock().push(message);
    }
}

/// Outbound chat and channel membership without any sessions behind them.
#[derive(Default)]
pub struct RecordingChat {
    replies: Mutex<Vec<(String, String)>>,
    joined: Mutex<Vec<String>>,
}

impl RecordingChat {
    pub fn replies(&self) -> Vec<(String, String)> {
        self.replies.lock().clone()
    }

    pub fn joined(&self) -> Vec<String> {
        self.joined.lock().clone()
    }
}

#[async_trait]
impl ChatOutbound for RecordingChat {
    async fn send_message(&self, channel: &str, text: &str) -> Result<(), Error> {
        self.replies.lock().push((channel.to_string(), text.to_string()));
        Ok(())
    }
}

#[async_trait]
impl ChannelMembership for RecordingChat {
    async fn ensure_connected(&self, channel: &str) -> Result<JoinOutcome, Error> {
        let mut joined = self.joined.lock();
        if joined.iter().any(|c| c == channel) {
            return Ok(JoinOutcome::AlreadyConnected);
        }
        joined.push(channel.to_string());
        Ok(JoinOutcome::NewlyConnected)
    }

    async fn remove(&self, channel: &str) -> Result<bool, Error> {
        let mut joined = self.joined.lock();
        let before = joined.len();
        joined.retain(|c| c != channel);
        Ok(joined.len() != before)
    }
}

/// Pronoun catalog that knows nobody.
#[derive(Debug, Default)]
pub struct NoPronouns;

#[async_trait]
impl PronounApi for NoPronouns {
    async fn list_pronouns(&self) -> Result<Vec<Pronoun>, Error> {
        Ok(Vec::new())
    }

    async fn user_pronoun_id(&self, _login: &str) -> Result<Option<String>, Error> {
        Ok(None)
    }
}
