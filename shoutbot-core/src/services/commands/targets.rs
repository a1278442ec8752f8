// `?addso` / `?removeso`: manage the channel's auto-shoutout list.

use tracing::info;

use shoutbot_common::models::{Channel, ShoutoutTarget};

use crate::services::commands::CommandContext;
use crate::services::user_service::UserService;
use crate::repositories::Repositories;
use crate::Error;

/// Result of adding or removing a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetChange {
    Added,
    Removed,
    SelfShoutout,
    AlreadyExists,
    UserNotFound,
    NotATarget,
}

impl TargetChange {
    pub fn reply(&self, login: &str) -> String {
        match self {
            TargetChange::Added => format!("Shoutout for {} added successfully.", login),
            TargetChange::Removed => format!("Shoutout for {} removed.", login),
            TargetChange::SelfShoutout => "You cannot shoutout yourself.".to_string(),
            TargetChange::AlreadyExists => format!("Shoutout for {} already exists.", login),
            TargetChange::UserNotFound => format!("User {} not found.", login),
            TargetChange::NotATarget => format!("No shoutout found for {}.", login),
        }
    }
}

pub async fn add_target(
    repos: &Repositories,
    users: &UserService,
    channel: &Channel,
    login: &str,
) -> Result<TargetChange, Error> {
    let Some(user) = users.resolve_user(login).await? else {
        return Ok(TargetChange::UserNotFound);
    };
    if user.id == channel.id {
        return Ok(TargetChange::SelfShoutout);
    }
    if repos.targets.get_target(&channel.id, &user.id).await?.is_some() {
        return Ok(TargetChange::AlreadyExists);
    }
    repos
        .targets
        .create_target(&ShoutoutTarget::new(&channel.id, &user.id))
        .await?;
    info!("Auto-shoutout for {} added in #{}", user.username, channel.name);
    Ok(TargetChange::Added)
}

/// Only users already known to storage can be removed.
pub async fn remove_target(
    repos: &Repositories,
    channel: &Channel,
    login: &str,
) -> Result<TargetChange, Error> {
    let login = login.trim_start_matches('@').to_lowercase();
    let Some(user) = repos.users.get_user_by_login(&login).await? else {
        return Ok(TargetChange::UserNotFound);
    };
    if repos.targets.delete_target(&channel.id, &user.id).await? {
        info!("Auto-shoutout for {} removed in #{}", user.username, channel.name);
        Ok(TargetChange::Removed)
    } else {
        Ok(TargetChange::NotATarget)
    }
}

pub async fn handle_add_target(
    ctx: &CommandContext<'_>,
    channel: &Channel,
) -> Result<Option<String>, Error> {
    let Some(login) = ctx.command.first_argument_login() else {
        return Ok(Some(format!("Usage: {}addso @user", ctx.prefix)));
    };
    let change = add_target(ctx.repos, ctx.users, channel, &login).await?;
    Ok(Some(change.reply(&login)))
}

pub async fn handle_remove_target(
    ctx: &CommandContext<'_>,
    channel: &Channel,
) -> Result<Option<String>, Error> {
    let Some(login) = ctx.command.first_argument_login() else {
        return Ok(Some(format!("Usage: {}removeso @user", ctx.prefix)));
    };
    let change = remove_target(ctx.repos, channel, &login).await?;
    Ok(Some(change.reply(&login)))
}
