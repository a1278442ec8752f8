// shoutbot-core/src/tasks/live_status.rs

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use shoutbot_common::traits::api::TwitchApi;

use crate::connections::ChannelMembership;
use crate::repositories::Repositories;
use crate::services::user_service::UserService;
use crate::Error;

const HELIX_BATCH: usize = 100;

/// Keeps `is_live` and channel info current for every enabled channel, and
/// re-joins any enabled channel whose chat session dropped.
pub struct LiveStatusMonitor {
    api: Arc<dyn TwitchApi>,
    repos: Repositories,
    users: Arc<UserService>,
    membership: Arc<dyn ChannelMembership>,
}

impl LiveStatusMonitor {
    pub fn new(
        api: Arc<dyn TwitchApi>,
        repos: Repositories,
        users: Arc<UserService>,
        membership: Arc<dyn ChannelMembership>,
    ) -> Self {
        Self { api, repos, users, membership }
    }

    /// Returns the number of channels currently live.
    pub async fn run_once(&self) -> Result<usize, Error> {
        let channels = self.repos.channels.list_enabled_channels().await?;
        if channels.is_empty() {
            return Ok(0);
        }

        let ids: Vec<String> = channels.iter().map(|c| c.id.clone()).collect();
        let mut live = HashSet::new();
        for batch in ids.chunks(HELIX_BATCH) {
            for stream in self.api.get_live_streams(batch).await? {
                live.insert(stream.user_id);
            }
        }

        for channel in &channels {
            let is_live = live.contains(&channel.id);
            self.repos.users.set_live(&channel.id, is_live).await?;

            if is_live {
                if let Some(user) = self.repos.users.get_user(&channel.id).await? {
                    self.users.refresh_live_info(&user).await;
                }
            }
            if let Err(e) = self.membership.ensure_connected(&channel.name).await {
                warn!("Could not rejoin #{}: {}", channel.name, e);
            }
        }

        debug!("{} of {} channels live", live.len(), channels.len());
        Ok(live.len())
    }

    pub fn spawn(self: Arc<Self>, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if let Err(e) = self.run_once().await {
                    warn!("Live status refresh failed: {}", e);
                }
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            debug!("Live status monitor stopped");
        })
    }
}
