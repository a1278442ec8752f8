use std::time::Duration;

use tracing::warn;

use shoutbot_common::models::Channel;

use crate::services::commands::targets::TargetChange;
use crate::services::commands::CommandContext;
use crate::services::cooldown::CooldownBlock;
use crate::services::shoutout_service::{ShoutoutOutcome, ShoutoutRequest, ShoutoutTrigger};
use crate::Error;

/// `?so [@user]`; the sender is shouted out when no user is given.
pub async fn handle_shoutout(
    ctx: &CommandContext<'_>,
    channel: &Channel,
) -> Result<Option<String>, Error> {
    let login = ctx.target_login();
    let Some(user) = ctx.users.resolve_user(&login).await? else {
        return Ok(Some(format!("User {} not found.", login)));
    };
    if user.id == channel.id {
        return Ok(Some(TargetChange::SelfShoutout.reply(&login)));
    }
    let live_info = ctx.users.refresh_live_info(&user).await;

    let request = ShoutoutRequest {
        channel: channel.clone(),
        target: user,
        live_info,
        template_override: None,
        target_id: None,
        trigger: ShoutoutTrigger::Manual,
    };

    match ctx.shoutouts.attempt(request).await {
        Ok(ShoutoutOutcome::Fired { .. }) => Ok(None),
        Ok(ShoutoutOutcome::OnCooldown(block)) => Ok(Some(cooldown_reply(block, &login))),
        Err(e) => {
            warn!("Shoutout for {} in #{} failed: {}", login, channel.name, e);
            Ok(Some(format!("Failed to send shoutout: {}", e.chat_message())))
        }
    }
}

pub fn cooldown_reply(block: CooldownBlock, login: &str) -> String {
    match block {
        CooldownBlock::Channel { remaining } => {
            let (_, m, s) = split(remaining);
            format!("Channel shoutout is on cooldown. Try again in {}m {}s.", m, s)
        }
        CooldownBlock::User { remaining } => {
            let (h, m, _) = split(remaining);
            format!(
                "@{} was recently shouted out in this channel. Try again in {}h {}m.",
                login, h, m
            )
        }
        CooldownBlock::InFlight => "A shoutout for this channel is already being sent.".to_string(),
    }
}

fn split(d: Duration) -> (u64, u64, u64) {
    let secs = d.as_secs();
    (secs / 3600, (secs % 3600) / 60, secs % 60)
}
