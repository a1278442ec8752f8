use tracing::info;

use shoutbot_common::models::Channel;

use crate::connections::JoinOutcome;
use crate::services::commands::CommandContext;
use crate::Error;

/// Registers the sender's own channel and connects to it.
pub async fn handle_join(ctx: &CommandContext<'_>) -> Result<Option<String>, Error> {
    let msg = ctx.message;
    let login = msg.login.to_lowercase();

    let existing = ctx.repos.channels.get_channel(&msg.user_id).await?;
    if let Some(ch) = &existing {
        if ch.enabled {
            // reconnects quietly if the session went stale
            ctx.membership.ensure_connected(&ch.name).await?;
            return Ok(Some("Bot is already in your channel!".to_string()));
        }
    }

    ctx.users
        .get_or_create_from_chat(&msg.user_id, &login, &msg.display_name)
        .await?;

    match existing {
        Some(_) => ctx.repos.channels.set_channel_enabled(&msg.user_id, true).await?,
        None => ctx.repos.channels.create_channel(&Channel::new(&msg.user_id, &login)).await?,
    }

    let outcome = ctx.membership.ensure_connected(&login).await?;
    info!("{} asked the bot to join #{} ({:?})", msg.login, login, outcome);

    Ok(Some(match outcome {
        JoinOutcome::AlreadyConnected => "Bot is already in your channel!".to_string(),
        JoinOutcome::NewlyConnected => format!(
            "Bot will join your channel! Use {}help to see available commands.",
            ctx.prefix
        ),
    }))
}
