// src/repositories/postgres/mod.rs

pub mod channels;
pub mod live_info;
pub mod moderators;
pub mod pronouns;
pub mod targets;
pub mod users;
