// Helix request groups. Each file adds methods to `TwitchHelixClient`.

pub mod channels;
pub mod chat;
pub mod moderation;
pub mod streams;
pub mod users;
