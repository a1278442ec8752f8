// =============================================================================
// shoutbot-core/src/auth/mod.rs
// =============================================================================

pub mod manager;
pub mod session;
pub mod token_store;

pub use manager::AuthManager;
pub use session::BotSession;
pub use token_store::TokenFileStore;

/// Scopes requested for the bot account and for broadcasters who authorize it.
pub const BOT_SCOPES: &[&str] = &[
    "channel:bot",
    "chat:edit",
    "chat:read",
    "moderation:read",
    "moderator:manage:announcements",
    "moderator:manage:shoutouts",
    "moderator:read:shoutouts",
    "user:bot",
    "user:read:broadcast",
    "user:read:email",
    "user:read:moderated_channels",
];
