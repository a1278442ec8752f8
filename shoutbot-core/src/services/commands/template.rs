use chrono::Utc;

use shoutbot_common::models::{Channel, DEFAULT_SHOUTOUT_TEMPLATE};

use crate::services::commands::CommandContext;
use crate::Error;

pub async fn handle_set_template(
    ctx: &CommandContext<'_>,
    mut channel: Channel,
) -> Result<Option<String>, Error> {
    let template = ctx.command.arguments.trim();
    if template.is_empty() {
        return Ok(Some("Please provide a shoutout template.".to_string()));
    }
    channel.shoutout_template = template.to_string();
    channel.updated_at = Utc::now();
    ctx.repos.channels.update_channel(&channel).await?;
    Ok(Some("Shoutout template updated successfully.".to_string()))
}

pub async fn handle_reset_template(
    ctx: &CommandContext<'_>,
    mut channel: Channel,
) -> Result<Option<String>, Error> {
    channel.shoutout_template = DEFAULT_SHOUTOUT_TEMPLATE.to_string();
    channel.updated_at = Utc::now();
    ctx.repos.channels.update_channel(&channel).await?;
    Ok(Some("Shoutout template reset to default.".to_string()))
}
