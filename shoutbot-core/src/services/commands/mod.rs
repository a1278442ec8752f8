// File: shoutbot-core/src/services/commands/mod.rs
//! The chat command table and its dispatcher.
//!
//! Each command lives in its own file; `CommandRouter::dispatch` checks the
//! sender's permission against storage, calls the handler and sends back the
//! reply it returns. Unknown commands and permission failures get no reply;
//! a handler error is reported back in chat.

pub mod help;
pub mod join;
pub mod shoutout;
pub mod targets;
pub mod template;

use std::sync::Arc;

use tracing::{debug, error};

use shoutbot_common::models::Channel;

use crate::connections::{ChannelMembership, ChatOutbound};
use crate::platforms::ChatMessage;
use crate::repositories::Repositories;
use crate::services::command_parser::ParsedCommand;
use crate::services::shoutout_service::ShoutoutService;
use crate::services::user_service::UserService;
use crate::Error;

/// Ordered so that a higher level includes the lower ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Permission {
    Everyone,
    Moderator,
    Broadcaster,
}

#[derive(Debug)]
pub struct CommandSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    pub permission: Permission,
}

/// Public commands first; `help` relies on that order.
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec { name: "join", aliases: &[], description: "Add bot to your channel", permission: Permission::Everyone },
    CommandSpec { name: "help", aliases: &[], description: "Show available commands", permission: Permission::Everyone },
    CommandSpec { name: "so", aliases: &[], description: "Manual shoutout", permission: Permission::Moderator },
    CommandSpec { name: "addso", aliases: &[], description: "Add auto-shoutout", permission: Permission::Moderator },
    CommandSpec { name: "removeso", aliases: &["delso"], description: "Remove auto-shoutout", permission: Permission::Moderator },
    CommandSpec { name: "sotemplate", aliases: &["settemplate"], description: "Set shoutout template", permission: Permission::Broadcaster },
    CommandSpec { name: "resetso", aliases: &["resettemplate"], description: "Reset shoutout template to default", permission: Permission::Broadcaster },
];

pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS
        .iter()
        .find(|c| c.name == name || c.aliases.contains(&name))
}

/// Everything a handler may touch.
pub struct CommandContext<'a> {
    pub message: &'a ChatMessage,
    pub command: &'a ParsedCommand,
    pub repos: &'a Repositories,
    pub users: &'a Arc<UserService>,
    pub shoutouts: &'a Arc<ShoutoutService>,
    pub membership: &'a dyn ChannelMembership,
    pub prefix: &'a str,
}

impl CommandContext<'_> {
    /// Login named by the first argument, or the sender when there is none.
    pub fn target_login(&self) -> String {
        self.command
            .first_argument_login()
            .unwrap_or_else(|| self.message.login.to_lowercase())
    }
}

pub struct CommandRouter {
    repos: Repositories,
    users: Arc<UserService>,
    shoutouts: Arc<ShoutoutService>,
    outbound: Arc<dyn ChatOutbound>,
    membership: Arc<dyn ChannelMembership>,
    prefix: String,
}

impl CommandRouter {
    pub fn new(
        repos: Repositories,
        users: Arc<UserService>,
        shoutouts: Arc<ShoutoutService>,
        outbound: Arc<dyn ChatOutbound>,
        membership: Arc<dyn ChannelMembership>,
        prefix: &str,
    ) -> Self {
        Self {
            repos,
            users,
            shoutouts,
            outbound,
            membership,
            prefix: prefix.to_string(),
        }
    }

    /// Runs `command` and sends its reply, if any, to the message's channel.
    pub async fn dispatch(&self, command: &ParsedCommand, message: &ChatMessage) {
        let reply = match self.execute(command, message).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(
                    "Command '{}' from {} in #{} failed: {}",
                    command.name, message.login, message.channel, e
                );
                Some(format!("Command failed: {}", e.chat_message()))
            }
        };
        if let Some(text) = reply {
            if let Err(e) = self.outbound.send_message(&message.channel, &text).await {
                error!("Reply to #{} failed: {}", message.channel, e);
            }
        }
    }

    /// Same as `dispatch` but hands the reply back instead of sending it.
    pub async fn execute(
        &self,
        command: &ParsedCommand,
        message: &ChatMessage,
    ) -> Result<Option<String>, Error> {
        let Some(spec) = lookup(&command.name) else {
            debug!("Ignoring unknown command '{}' in #{}", command.name, message.channel);
            return Ok(None);
        };

        let ctx = CommandContext {
            message,
            command,
            repos: &self.repos,
            users: &self.users,
            shoutouts: &self.shoutouts,
            membership: self.membership.as_ref(),
            prefix: &self.prefix,
        };

        match spec.name {
            "join" => return join::handle_join(&ctx).await,
            "help" => return Ok(Some(help::help_text(&self.prefix))),
            _ => {}
        }

        let Some(channel) = self.repos.channels.get_channel_by_name(&message.channel).await? else {
            debug!("'{}' used in unregistered channel #{}", command.name, message.channel);
            return Ok(None);
        };

        let level = self.sender_level(message, &channel).await?;
        if level < spec.permission {
            debug!(
                "Denied '{}' for {} in #{} (has {:?}, needs {:?}, chat flags {:?})",
                spec.name, message.login, channel.name, level, spec.permission, command.roles
            );
            return Ok(None);
        }

        match spec.name {
            "so" => shoutout::handle_shoutout(&ctx, &channel).await,
            "addso" => targets::handle_add_target(&ctx, &channel).await,
            "removeso" => targets::handle_remove_target(&ctx, &channel).await,
            "sotemplate" => template::handle_set_template(&ctx, channel).await,
            "resetso" => template::handle_reset_template(&ctx, channel).await,
            _ => Ok(None),
        }
    }

    /// Broadcaster when the sender owns the channel, moderator when a stored
    /// moderator row says so. Chat badges are not trusted.
    async fn sender_level(&self, message: &ChatMessage, channel: &Channel) -> Result<Permission, Error> {
        if message.user_id == channel.id {
            return Ok(Permission::Broadcaster);
        }
        if self.repos.moderators.is_moderator(&channel.id, &message.user_id).await? {
            return Ok(Permission::Moderator);
        }
        Ok(Permission::Everyone)
    }
}
