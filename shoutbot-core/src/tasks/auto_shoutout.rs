// shoutbot-core/src/tasks/auto_shoutout.rs

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::seq::IndexedRandom;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use shoutbot_common::models::{LiveChannel, ShoutoutCandidate};

use crate::config::ShoutoutSettings;
use crate::repositories::Repositories;
use crate::services::shoutout_service::{
    ShoutoutOutcome, ShoutoutRequest, ShoutoutService, ShoutoutTrigger,
};
use crate::services::user_service::UserService;
use crate::Error;

/// Periodically shouts out one configured target per live channel.
pub struct AutoShoutoutScheduler {
    repos: Repositories,
    users: Arc<UserService>,
    shoutouts: Arc<ShoutoutService>,
    settings: ShoutoutSettings,
}

impl AutoShoutoutScheduler {
    pub fn new(
        repos: Repositories,
        users: Arc<UserService>,
        shoutouts: Arc<ShoutoutService>,
        settings: ShoutoutSettings,
    ) -> Self {
        Self {
            repos,
            users,
            shoutouts,
            settings,
        }
    }

    /// Targets whose window has elapsed at `now`. The broadcaster is never
    /// their own target.
    pub fn eligible<'a>(
        &self,
        live: &'a LiveChannel,
        now: DateTime<Utc>,
    ) -> Vec<&'a ShoutoutCandidate> {
        let window = self.settings.target_window.window_for(live.candidates.len());
        let window = ChronoDuration::from_std(window).unwrap_or_else(|_| ChronoDuration::hours(1));
        live.candidates
            .iter()
            .filter(|c| c.target.enabled)
            .filter(|c| c.user.id != live.channel.id)
            .filter(|c| c.target.window_elapsed(window, now))
            .collect()
    }

    /// One pass over all live channels. Returns how many shoutouts went out.
    /// A failing channel is logged and skipped.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<usize, Error> {
        let live_channels = self.repos.channels.list_live_channels_with_targets().await?;
        debug!("Auto shoutout cycle over {} live channels", live_channels.len());

        let mut fired = 0;
        for live in &live_channels {
            let channel = &live.channel;
            if !channel.interval_elapsed(now) {
                continue;
            }

            let picked = {
                let eligible = self.eligible(live, now);
                eligible.choose(&mut rand::rng()).map(|c| (*c).clone())
            };
            let Some(candidate) = picked else {
                continue;
            };

            let live_info = match self.users.refresh_live_info(&candidate.user).await {
                Some(info) => Some(info),
                None => candidate.live_info.clone(),
            };
            let request = ShoutoutRequest {
                channel: channel.clone(),
                target: candidate.user.clone(),
                live_info,
                template_override: candidate.target.message_template.clone(),
                target_id: Some(candidate.target.id),
                trigger: ShoutoutTrigger::Auto,
            };

            match self.shoutouts.attempt_at(request, now).await {
                Ok(ShoutoutOutcome::Fired { .. }) => {
                    info!("Auto shoutout in #{} for {}", channel.name, candidate.user.username);
                    fired += 1;
                }
                Ok(ShoutoutOutcome::OnCooldown(block)) => {
                    debug!("Auto shoutout in #{} skipped: {:?}", channel.name, block);
                }
                Err(e) => {
                    warn!("Auto shoutout in #{} failed: {}", channel.name, e);
                }
            }
        }
        Ok(fired)
    }

    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Auto shoutout scheduler running every {:?}",
                self.settings.scheduler_interval
            );
            loop {
                let pause = match self.run_cycle(Utc::now()).await {
                    Ok(_) => self.settings.scheduler_interval,
                    Err(e) => {
                        error!("Auto shoutout cycle failed: {}", e);
                        self.settings.scheduler_backoff
                    }
                };
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(pause) => {}
                }
            }
            debug!("Auto shoutout scheduler stopped");
        })
    }
}
