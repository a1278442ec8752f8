// shoutbot-core/src/connections/session.rs

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::connections::ChatEventHandler;
use crate::platforms::{ChatConnector, ChatCredentials, ChatEvent, ChatTransport, ConnectionStatus};
use crate::Error;

struct ActiveLink {
    transport: Arc<dyn ChatTransport>,
    worker: JoinHandle<()>,
}

/// One chat connection bound to one channel.
///
/// Inbound events are drained by a dedicated worker task, so the handler sees
/// a channel's messages strictly in order and never blocks the socket reader.
pub struct ChannelSession {
    channel: String,
    connector: Arc<dyn ChatConnector>,
    handler: Arc<dyn ChatEventHandler>,
    status: Arc<RwLock<ConnectionStatus>>,
    link: Mutex<Option<ActiveLink>>,
    /// Serializes connect / reconnect / disconnect.
    op_lock: AsyncMutex<()>,
}

impl ChannelSession {
    pub fn new(
        channel: &str,
        connector: Arc<dyn ChatConnector>,
        handler: Arc<dyn ChatEventHandler>,
    ) -> Self {
        Self {
            channel: channel.to_lowercase(),
            connector,
            handler,
            status: Arc::new(RwLock::new(ConnectionStatus::Disconnected)),
            link: Mutex::new(None),
            op_lock: AsyncMutex::new(()),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.read()
    }

    /// Connecting or Connected.
    pub fn is_active(&self) -> bool {
        matches!(
            self.status(),
            ConnectionStatus::Connecting | ConnectionStatus::Connected
        )
    }

    pub async fn connect(&self, credentials: &ChatCredentials) -> Result<(), Error> {
        let _op = self.op_lock.lock().await;
        self.connect_locked(credentials).await
    }

    /// Marks a fresh session as `Connecting` before any link exists, so it
    /// reads as active while its first `connect` is still pending.
    pub fn claim(&self) {
        set_unless_closed(&self.status, ConnectionStatus::Connecting);
    }

    async fn connect_locked(&self, credentials: &ChatCredentials) -> Result<(), Error> {
        match self.status() {
            ConnectionStatus::Closed => {
                return Err(Error::Chat(format!("session for #{} is closed", self.channel)));
            }
            ConnectionStatus::Connected => return Ok(()),
            // claimed but never opened
            ConnectionStatus::Connecting if self.link.lock().is_none() => {}
            ConnectionStatus::Connecting => return Ok(()),
            ConnectionStatus::Disconnected => {}
        }
        // a link closed by the remote is still parked here
        self.teardown().await;

        *self.status.write() = ConnectionStatus::Connecting;
        debug!("Opening chat connection for #{}", self.channel);

        let link = match self.connector.open(&self.channel, credentials).await {
            Ok(link) => link,
            Err(e) => {
                set_unless_closed(&self.status, ConnectionStatus::Disconnected);
                return Err(e);
            }
        };

        let worker = tokio::spawn(run_worker(
            self.channel.clone(),
            link.events,
            Arc::clone(&self.handler),
            Arc::clone(&self.status),
        ));
        *self.link.lock() = Some(ActiveLink {
            transport: Arc::from(link.transport),
            worker,
        });
        Ok(())
    }

    /// Tears the link down and opens a new one with the same handler.
    pub async fn reconnect(&self, credentials: &ChatCredentials) -> Result<(), Error> {
        let _op = self.op_lock.lock().await;
        if self.status() == ConnectionStatus::Closed {
            return Err(Error::Chat(format!("session for #{} is closed", self.channel)));
        }
        self.teardown().await;
        set_unless_closed(&self.status, ConnectionStatus::Disconnected);
        info!("Reconnecting chat session for #{}", self.channel);
        self.connect_locked(credentials).await
    }

    /// Closes the session for good. Safe to call any number of times.
    pub async fn disconnect(&self) {
        let _op = self.op_lock.lock().await;
        *self.status.write() = ConnectionStatus::Closed;
        self.teardown().await;
    }

    pub async fn send(&self, text: &str) -> Result<(), Error> {
        let transport = self
            .link
            .lock()
            .as_ref()
            .map(|l| Arc::clone(&l.transport))
            .ok_or_else(|| Error::Chat(format!("not connected to #{}", self.channel)))?;
        transport.send_privmsg(&self.channel, text).await
    }

    async fn teardown(&self) {
        let taken = self.link.lock().take();
        if let Some(link) = taken {
            if let Err(e) = link.transport.close().await {
                warn!("Closing chat transport for #{} failed: {}", self.channel, e);
            }
            link.worker.abort();
            debug!("Chat link for #{} torn down", self.channel);
        }
    }
}

fn set_unless_closed(status: &RwLock<ConnectionStatus>, next: ConnectionStatus) {
    let mut guard = status.write();
    if *guard != ConnectionStatus::Closed {
        *guard = next;
    }
}

async fn run_worker(
    channel: String,
    mut events: mpsc::Receiver<ChatEvent>,
    handler: Arc<dyn ChatEventHandler>,
    status: Arc<RwLock<ConnectionStatus>>,
) {
    while let Some(event) = events.recv().await {
        match event {
            ChatEvent::Connected => {
                set_unless_closed(&status, ConnectionStatus::Connected);
                info!("Joined #{}", channel);
            }
            ChatEvent::Message(msg) => handler.on_message(msg).await,
            ChatEvent::Notice(text) => debug!("#{} notice: {}", channel, text),
            ChatEvent::Error(text) => warn!("#{} chat error: {}", channel, text),
            ChatEvent::Closed => {
                info!("Chat connection for #{} closed by remote", channel);
                break;
            }
        }
    }
    set_unless_closed(&status, ConnectionStatus::Disconnected);
}
