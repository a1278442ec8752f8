// File: src/services/mod.rs

pub mod channel_admin;
pub mod chat_handler;
pub mod command_parser;
pub mod commands;
pub mod cooldown;
pub mod pronoun_service;
pub mod shoutout_service;
pub mod template;
pub mod user_service;

pub use channel_admin::ChannelAdmin;
pub use chat_handler::{ChatCommandHandler, NoopMessageHook, PlainMessageHook};
pub use command_parser::{CommandParser, ParsedCommand};
pub use commands::CommandRouter;
pub use cooldown::{Cooldown, CooldownBlock, CooldownTracker};
pub use pronoun_service::PronounService;
pub use shoutout_service::{ShoutoutOutcome, ShoutoutRequest, ShoutoutService, ShoutoutTrigger};
pub use template::TemplateEngine;
pub use user_service::UserService;
