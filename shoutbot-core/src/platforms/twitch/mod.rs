// File: src/platforms/twitch/mod.rs

pub mod auth;
pub mod client;
pub mod requests;

pub use auth::TwitchAuthenticator;
pub use client::TwitchHelixClient;
