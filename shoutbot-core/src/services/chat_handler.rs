// File: shoutbot-core/src/services/chat_handler.rs

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::connections::ChatEventHandler;
use crate::platforms::ChatMessage;
use crate::services::command_parser::CommandParser;
use crate::services::commands::CommandRouter;

/// Gets every chat line that is not a command.
#[async_trait]
pub trait PlainMessageHook: Send + Sync {
    async fn on_plain_message(&self, message: &ChatMessage);
}

#[derive(Debug, Default)]
pub struct NoopMessageHook;

#[async_trait]
impl PlainMessageHook for NoopMessageHook {
    async fn on_plain_message(&self, message: &ChatMessage) {
        trace!("[#{}] {}: {}", message.channel, message.login, message.text);
    }
}

/// Parse, then route. Installed into every channel session.
pub struct ChatCommandHandler {
    parser: CommandParser,
    router: Arc<CommandRouter>,
    hook: Arc<dyn PlainMessageHook>,
}

impl ChatCommandHandler {
    pub fn new(parser: CommandParser, router: Arc<CommandRouter>) -> Self {
        Self {
            parser,
            router,
            hook: Arc::new(NoopMessageHook),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn PlainMessageHook>) -> Self {
        self.hook = hook;
        self
    }
}

#[async_trait]
impl ChatEventHandler for ChatCommandHandler {
    async fn on_message(&self, message: ChatMessage) {
        if message.roles.bot {
            return;
        }
        match self.parser.parse(&message.text, message.roles) {
            Some(command) => {
                debug!(
                    "[#{}] {} ran '{}' args={:?}",
                    message.channel, message.login, command.name, command.argument_list
                );
                self.router.dispatch(&command, &message).await;
            }
            None => self.hook.on_plain_message(&message).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use parking_lot::Mutex;
    use shoutbot_common::models::TokenSet;

    use crate::auth::BotSession;
    use crate::connections::MockChatOutbound;
    use crate::platforms::SenderRoles;
    use crate::repositories::Repositories;
    use crate::services::{CooldownTracker, PronounService, ShoutoutService, UserService};
    use crate::test_utils::{InMemoryStore, NoPronouns, RecordingChat, RecordingTwitchApi};
    use crate::Error;

    #[derive(Default)]
    struct Plain(Mutex<Vec<String>>);

    #[async_trait]
    impl PlainMessageHook for Plain {
        async fn on_plain_message(&self, message: &ChatMessage) {
            self.0.lock().push(message.text.clone());
        }
    }

    fn handler(outbound: MockChatOutbound, hook: Arc<Plain>) -> ChatCommandHandler {
        let api = Arc::new(RecordingTwitchApi::new());
        let repos = Repositories::from_store(Arc::new(InMemoryStore::new()));
        let pronouns = Arc::new(PronounService::new(Arc::new(NoPronouns), repos.pronouns.clone()));
        let users = Arc::new(UserService::new(api.clone(), repos.clone(), pronouns));
        let session = Arc::new(BotSession::new(
            "cid",
            "999",
            "shoutbot",
            TokenSet::from_expires_in("t".into(), "r".into(), 14_000),
        ));
        let cooldowns = Arc::new(CooldownTracker::new(Duration::from_secs(120), Duration::from_secs(3600)));
        let shoutouts = Arc::new(ShoutoutService::new(api, cooldowns, repos.clone(), session));
        let router = CommandRouter::new(
            repos,
            users,
            shoutouts,
            Arc::new(outbound),
            Arc::new(RecordingChat::default()),
            "?",
        );
        ChatCommandHandler::new(CommandParser::new("?"), Arc::new(router)).with_hook(hook)
    }

    fn line(text: &str, roles: SenderRoles) -> ChatMessage {
        ChatMessage {
            channel: "alice".into(),
            room_id: "100".into(),
            user_id: "400".into(),
            login: "dave".into(),
            display_name: "Dave".into(),
            text: text.into(),
            roles,
        }
    }

    #[tokio::test]
    async fn commands_reply_and_plain_lines_reach_hook() {
        let mut outbound = MockChatOutbound::new();
        outbound.expect_send_message().times(1).returning(|channel, text| {
            if channel == "alice" && text.starts_with("?join - ") {
                Ok(())
            } else {
                Err(Error::Chat(format!("unexpected reply {text} to #{channel}")))
            }
        });
        let plain = Arc::new(Plain::default());
        let handler = handler(outbound, plain.clone());

        handler.on_message(line("?help", SenderRoles::default())).await;
        handler.on_message(line("nice run!", SenderRoles::default())).await;
        let own = SenderRoles { bot: true, ..SenderRoles::default() };
        handler.on_message(line("?help", own)).await;

        assert_eq!(*plain.0.lock(), vec!["nice run!".to_string()]);
    }
}
