// shoutbot-core/src/connections/pool.rs

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::join_all;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::connections::{
    ChannelMembership, ChannelSession, ChatEventHandler, ChatOutbound, JoinOutcome,
};
use crate::platforms::{ChatConnector, ChatCredentials};
use crate::tasks::token_refresh::TokenRefreshed;
use crate::Error;

/// All live chat sessions, at most one per channel name.
pub struct ConnectionPool {
    sessions: DashMap<String, Arc<ChannelSession>>,
    connector: Arc<dyn ChatConnector>,
    handler: Arc<dyn ChatEventHandler>,
    credentials: RwLock<ChatCredentials>,
    shutdown_grace: Duration,
}

/// Non-owning handle given to code the pool itself owns (the chat handler and
/// everything behind it). Calls fail once the pool is gone.
#[derive(Clone)]
pub struct PoolHandle(Weak<ConnectionPool>);

impl PoolHandle {
    fn upgrade(&self) -> Result<Arc<ConnectionPool>, Error> {
        self.0
            .upgrade()
            .ok_or_else(|| Error::Chat("connection pool has shut down".into()))
    }
}

#[async_trait]
impl ChatOutbound for PoolHandle {
    async fn send_message(&self, channel: &str, text: &str) -> Result<(), Error> {
        self.upgrade()?.send_message(channel, text).await
    }
}

#[async_trait]
impl ChannelMembership for PoolHandle {
    async fn ensure_connected(&self, channel: &str) -> Result<JoinOutcome, Error> {
        self.upgrade()?.ensure_connected(channel).await
    }

    async fn remove(&self, channel: &str) -> Result<bool, Error> {
        self.upgrade()?.remove(channel).await
    }
}

fn key(channel: &str) -> String {
    channel.trim_start_matches('#').to_lowercase()
}

impl ConnectionPool {
    /// `make_handler` receives a handle back to the pool, so commands like
    /// `?join` can add channels without the pool owning itself.
    pub fn new<F>(
        connector: Arc<dyn ChatConnector>,
        credentials: ChatCredentials,
        shutdown_grace: Duration,
        make_handler: F,
    ) -> Arc<Self>
    where
        F: FnOnce(PoolHandle) -> Arc<dyn ChatEventHandler>,
    {
        Arc::new_cyclic(|weak| Self {
            sessions: DashMap::new(),
            connector,
            handler: make_handler(PoolHandle(weak.clone())),
            credentials: RwLock::new(credentials),
            shutdown_grace,
        })
    }

    pub fn handle(self: &Arc<Self>) -> PoolHandle {
        PoolHandle(Arc::downgrade(self))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn channels(&self) -> Vec<String> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }

    pub fn session(&self, channel: &str) -> Option<Arc<ChannelSession>> {
        self.sessions.get(&key(channel)).map(|s| Arc::clone(s.value()))
    }

    /// Idempotent. A stale session (disconnected or closed) is replaced; a
    /// failed connect leaves no entry behind.
    pub async fn ensure_connected(&self, channel: &str) -> Result<JoinOutcome, Error> {
        let name = key(channel);
        if name.is_empty() {
            return Err(Error::Validation("channel name is empty".into()));
        }

        let session = {
            match self.sessions.entry(name.clone()) {
                Entry::Occupied(mut occ) => {
                    if occ.get().is_active() {
                        return Ok(JoinOutcome::AlreadyConnected);
                    }
                    debug!("Replacing stale session for #{}", name);
                    let fresh = self.new_session(&name);
                    let stale = occ.insert(Arc::clone(&fresh));
                    tokio::spawn(async move { stale.disconnect().await });
                    fresh
                }
                Entry::Vacant(vac) => {
                    let fresh = self.new_session(&name);
                    vac.insert(Arc::clone(&fresh));
                    fresh
                }
            }
        };

        let credentials = self.credentials.read().clone();
        match session.connect(&credentials).await {
            Ok(()) => {
                info!("Connected chat session for #{}", name);
                Ok(JoinOutcome::NewlyConnected)
            }
            Err(e) => {
                self.sessions
                    .remove_if(&name, |_, current| Arc::ptr_eq(current, &session));
                error!("Failed to connect to #{}: {}", name, e);
                Err(e)
            }
        }
    }

    /// Created already claimed, so a concurrent `ensure_connected` sees it
    /// as active once it is in the map.
    fn new_session(&self, name: &str) -> Arc<ChannelSession> {
        let session = Arc::new(ChannelSession::new(
            name,
            Arc::clone(&self.connector),
            Arc::clone(&self.handler),
        ));
        session.claim();
        session
    }

    /// Disconnects and forgets the channel's session.
    pub async fn remove(&self, channel: &str) -> Result<bool, Error> {
        match self.sessions.remove(&key(channel)) {
            Some((name, session)) => {
                session.disconnect().await;
                info!("Left #{}", name);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Connects the startup set concurrently; individual failures are logged.
    pub async fn connect_all(&self, channels: &[String]) -> usize {
        let results = join_all(channels.iter().map(|c| self.ensure_connected(c))).await;
        let ok = results.iter().filter(|r| r.is_ok()).count();
        info!("Connected to {}/{} channels", ok, channels.len());
        ok
    }

    pub async fn send_message(&self, channel: &str, text: &str) -> Result<(), Error> {
        let session = self
            .session(channel)
            .ok_or_else(|| Error::Chat(format!("no session for #{}", key(channel))))?;
        session.send(text).await
    }

    /// Swaps in new credentials and reconnects every session with them.
    pub async fn reconnect_all(&self, credentials: ChatCredentials) {
        *self.credentials.write() = credentials.clone();
        let sessions: Vec<Arc<ChannelSession>> =
            self.sessions.iter().map(|e| Arc::clone(e.value())).collect();
        info!("Reconnecting {} chat sessions with rotated token", sessions.len());

        let results = join_all(sessions.iter().map(|s| s.reconnect(&credentials))).await;
        for (session, result) in sessions.iter().zip(results) {
            if let Err(e) = result {
                warn!("Reconnect of #{} failed: {}", session.channel(), e);
            }
        }
    }

    /// Best-effort notice to every channel, a short grace period, then
    /// disconnect everything. One failing session never stops the others.
    pub async fn shutdown_all(&self, notice: &str) {
        let sessions: Vec<Arc<ChannelSession>> =
            self.sessions.iter().map(|e| Arc::clone(e.value())).collect();
        if sessions.is_empty() {
            return;
        }
        info!("Shutting down {} chat sessions", sessions.len());

        let sends = join_all(sessions.iter().map(|s| s.send(notice))).await;
        for (session, result) in sessions.iter().zip(sends) {
            if let Err(e) = result {
                warn!("Shutdown notice to #{} failed: {}", session.channel(), e);
            }
        }

        tokio::time::sleep(self.shutdown_grace).await;

        join_all(sessions.iter().map(|s| s.disconnect())).await;
        self.sessions.clear();
    }

    /// Reconnects all sessions whenever the bot account's token rotates.
    pub fn watch_token_rotation(
        self: &Arc<Self>,
        bot_user_id: String,
        mut rotations: broadcast::Receiver<TokenRefreshed>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let pool = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = cancel.cancelled() => break,
                    ev = rotations.recv() => ev,
                };
                match event {
                    Ok(TokenRefreshed { user_id, access_token }) if user_id == bot_user_id => {
                        let Some(pool) = pool.upgrade() else { break };
                        let login = pool.credentials.read().login.clone();
                        pool.reconnect_all(ChatCredentials {
                            login,
                            oauth_token: access_token,
                        })
                        .await;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Token rotation watcher lagged by {} messages", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("Token rotation watcher stopped");
        })
    }
}

#[async_trait]
impl ChatOutbound for ConnectionPool {
    async fn send_message(&self, channel: &str, text: &str) -> Result<(), Error> {
        ConnectionPool::send_message(self, channel, text).await
    }
}

#[async_trait]
impl ChannelMembership for ConnectionPool {
    async fn ensure_connected(&self, channel: &str) -> Result<JoinOutcome, Error> {
        ConnectionPool::ensure_connected(self, channel).await
    }

    async fn remove(&self, channel: &str) -> Result<bool, Error> {
        ConnectionPool::remove(self, channel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeChatConnector, RecordingHandler};

    fn creds(token: &str) -> ChatCredentials {
        ChatCredentials {
            login: "shoutbot".into(),
            oauth_token: token.into(),
        }
    }

    fn pool(connector: Arc<FakeChatConnector>) -> Arc<ConnectionPool> {
        ConnectionPool::new(connector, creds("t1"), Duration::from_millis(10), |_| {
            Arc::new(RecordingHandler::default())
        })
    }

    #[tokio::test]
    async fn ensure_connected_is_idempotent() {
        let connector = Arc::new(FakeChatConnector::new());
        let pool = pool(connector.clone());

        assert_eq!(pool.ensure_connected("Alice").await.unwrap(), JoinOutcome::NewlyConnected);
        assert_eq!(pool.ensure_connected("alice").await.unwrap(), JoinOutcome::AlreadyConnected);
        assert_eq!(pool.len(), 1);
        assert_eq!(connector.open_count("alice"), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_open_one_session() {
        let connector = Arc::new(FakeChatConnector::new());
        let pool = pool(connector.clone());

        let joins: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                tokio::spawn(async move { pool.ensure_connected("alice").await })
            })
            .collect();
        let mut fresh = 0;
        for join in joins {
            if join.await.unwrap().unwrap() == JoinOutcome::NewlyConnected {
                fresh += 1;
            }
        }

        assert_eq!(fresh, 1);
        assert_eq!(connector.open_count("alice"), 1);
        assert_eq!(connector.close_count("alice"), 0);
    }

    #[tokio::test]
    async fn failed_connect_leaves_no_entry() {
        let connector = Arc::new(FakeChatConnector::new());
        connector.fail_channel("bob");
        let pool = pool(connector.clone());

        assert!(pool.ensure_connected("bob").await.is_err());
        assert!(pool.session("bob").is_none());
        assert_eq!(pool.connect_all(&["bob".into(), "carol".into()]).await, 1);
        assert_eq!(pool.channels(), vec!["carol".to_string()]);
    }

    #[tokio::test]
    async fn remove_and_send() {
        let connector = Arc::new(FakeChatConnector::new());
        let pool = pool(connector.clone());
        pool.ensure_connected("alice").await.unwrap();

        pool.send_message("#alice", "hello").await.unwrap();
        assert_eq!(connector.sent("alice"), vec!["hello".to_string()]);

        assert!(pool.remove("alice").await.unwrap());
        assert!(!pool.remove("alice").await.unwrap());
        assert!(pool.send_message("alice", "gone").await.is_err());
    }

    #[tokio::test]
    async fn shutdown_notifies_then_closes_everyone() {
        let connector = Arc::new(FakeChatConnector::new());
        connector.fail_sends("bob");
        let pool = pool(connector.clone());
        pool.connect_all(&["alice".into(), "bob".into()]).await;
        let alice = pool.session("alice").unwrap();

        pool.shutdown_all("bye").await;
        assert_eq!(connector.sent("alice"), vec!["bye".to_string()]);
        assert!(pool.is_empty());
        assert_eq!(alice.status(), crate::platforms::ConnectionStatus::Closed);
        assert_eq!(connector.close_count("bob"), 1);
    }

    #[tokio::test]
    async fn rotation_reconnects_with_new_token() {
        let connector = Arc::new(FakeChatConnector::new());
        let pool = pool(connector.clone());
        pool.ensure_connected("alice").await.unwrap();

        let (tx, rx) = broadcast::channel(4);
        let cancel = CancellationToken::new();
        let watcher = pool.watch_token_rotation("42".into(), rx, cancel.clone());

        tx.send(TokenRefreshed { user_id: "7".into(), access_token: "other".into() }).unwrap();
        tx.send(TokenRefreshed { user_id: "42".into(), access_token: "t2".into() }).unwrap();

        for _ in 0..100 {
            if connector.open_count("alice") == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(connector.open_count("alice"), 2);
        assert_eq!(connector.last_token("alice").as_deref(), Some("t2"));

        cancel.cancel();
        watcher.await.unwrap();
    }

    #[tokio::test]
    async fn handle_fails_after_pool_dropped() {
        let connector = Arc::new(FakeChatConnector::new());
        let pool = pool(connector);
        let handle = pool.handle();
        drop(pool);
        assert!(handle.ensure_connected("alice").await.is_err());
    }
}
