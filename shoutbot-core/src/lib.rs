// src/lib.rs

pub mod auth;
pub mod config;
pub mod connections;
pub mod db;
pub mod platforms;
pub mod repositories;
pub mod services;
pub mod tasks;
pub mod test_utils;

pub use db::Database;
pub use shoutbot_common::error::Error;
