// File: shoutbot-core/src/services/shoutout_service.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shoutbot_common::models::{AnnouncementColor, Channel, ChannelLiveInfo, TwitchUser};
use shoutbot_common::traits::api::TwitchApi;

use crate::auth::BotSession;
use crate::repositories::Repositories;
use crate::services::cooldown::{CooldownBlock, CooldownTracker};
use crate::services::template::TemplateEngine;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShoutoutTrigger {
    /// `?so` from chat.
    Manual,
    /// The scheduler.
    Auto,
}

#[derive(Debug, Clone)]
pub struct ShoutoutRequest {
    pub channel: Channel,
    pub target: TwitchUser,
    pub live_info: Option<ChannelLiveInfo>,
    /// Per-target template; the channel's template is used when absent.
    pub template_override: Option<String>,
    /// Stored target row to stamp after an automatic shoutout.
    pub target_id: Option<Uuid>,
    pub trigger: ShoutoutTrigger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShoutoutOutcome {
    Fired { message: String },
    OnCooldown(CooldownBlock),
}

/// The one routine both `?so` and the scheduler go through:
/// render, reserve, shout out, announce, commit.
pub struct ShoutoutService {
    api: Arc<dyn TwitchApi>,
    cooldowns: Arc<CooldownTracker>,
    templates: TemplateEngine,
    repos: Repositories,
    session: Arc<BotSession>,
}

impl ShoutoutService {
    pub fn new(
        api: Arc<dyn TwitchApi>,
        cooldowns: Arc<CooldownTracker>,
        repos: Repositories,
        session: Arc<BotSession>,
    ) -> Self {
        Self {
            api,
            cooldowns,
            templates: TemplateEngine::new(),
            repos,
            session,
        }
    }

    pub fn cooldowns(&self) -> &Arc<CooldownTracker> {
        &self.cooldowns
    }

    pub fn render(&self, request: &ShoutoutRequest) -> String {
        let template = request
            .template_override
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&request.channel.shoutout_template);
        self.templates.render(
            template,
            &request.channel,
            &request.target,
            request.live_info.as_ref(),
            request.target.pronoun.as_ref(),
        )
    }

    pub async fn attempt(&self, request: ShoutoutRequest) -> Result<ShoutoutOutcome, Error> {
        self.attempt_at(request, Utc::now()).await
    }

    pub async fn attempt_at(
        &self,
        request: ShoutoutRequest,
        now: DateTime<Utc>,
    ) -> Result<ShoutoutOutcome, Error> {
        let channel = &request.channel;
        let target = &request.target;
        let message = self.render(&request);

        let reservation = match self.cooldowns.try_reserve_at(&channel.id, &target.id, now) {
            Ok(r) => r,
            Err(block) => {
                debug!(
                    "Shoutout {} -> {} blocked by cooldown: {:?}",
                    channel.name, target.username, block
                );
                if request.trigger == ShoutoutTrigger::Manual {
                    // the shoutout itself is refused, the info still goes out
                    self.announce(&channel.id, &message).await;
                }
                return Ok(ShoutoutOutcome::OnCooldown(block));
            }
        };

        self.api
            .send_shoutout(&channel.id, &target.id, self.session.bot_user_id())
            .await?;

        self.announce(&channel.id, &message).await;
        reservation.commit_at(now);
        info!(
            "Shoutout sent in #{} for {} ({:?})",
            channel.name, target.username, request.trigger
        );

        if request.trigger == ShoutoutTrigger::Auto {
            if let Err(e) = self.repos.channels.set_channel_last_shoutout(&channel.id, now).await {
                warn!("Could not persist shoutout time for #{}: {}", channel.name, e);
            }
            if let Some(target_id) = request.target_id {
                if let Err(e) = self.repos.targets.set_target_last_shoutout(target_id, now).await {
                    warn!("Could not persist shoutout time for target {}: {}", target_id, e);
                }
            }
        }

        Ok(ShoutoutOutcome::Fired { message })
    }

    async fn announce(&self, broadcaster_id: &str, message: &str) {
        let color = random_color();
        if let Err(e) = self.api.send_announcement(broadcaster_id, message, color).await {
            warn!("Announcement in {} failed: {}", broadcaster_id, e);
        }
    }
}

fn random_color() -> AnnouncementColor {
    AnnouncementColor::ALL
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(AnnouncementColor::Primary)
}
