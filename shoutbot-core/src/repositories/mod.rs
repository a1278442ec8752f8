// src/repositories/mod.rs

use std::sync::Arc;

use sqlx::{Pool, Postgres};
use shoutbot_common::traits::repository_traits::{
    ChannelInfoRepository, ChannelRepository, ModeratorRepository, PronounRepository,
    ShoutoutStore, ShoutoutTargetRepository, UserRepository,
};

pub mod postgres;

pub use postgres::channels::PostgresChannelRepository;
pub use postgres::live_info::PostgresChannelInfoRepository;
pub use postgres::moderators::PostgresModeratorRepository;
pub use postgres::pronouns::PostgresPronounRepository;
pub use postgres::targets::PostgresShoutoutTargetRepository;
pub use postgres::users::PostgresUserRepository;

/// Every storage handle the bot needs, passed around as one value.
#[derive(Clone)]
pub struct Repositories {
    pub channels: Arc<dyn ChannelRepository>,
    pub users: Arc<dyn UserRepository>,
    pub targets: Arc<dyn ShoutoutTargetRepository>,
    pub moderators: Arc<dyn ModeratorRepository>,
    pub live_info: Arc<dyn ChannelInfoRepository>,
    pub pronouns: Arc<dyn PronounRepository>,
}

impl Repositories {
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            channels: Arc::new(PostgresChannelRepository::new(pool.clone())),
            users: Arc::new(PostgresUserRepository::new(pool.clone())),
            targets: Arc::new(PostgresShoutoutTargetRepository::new(pool.clone())),
            moderators: Arc::new(PostgresModeratorRepository::new(pool.clone())),
            live_info: Arc::new(PostgresChannelInfoRepository::new(pool.clone())),
            pronouns: Arc::new(PostgresPronounRepository::new(pool)),
        }
    }

    /// Wraps a single store that implements every repository trait.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: ShoutoutStore + 'static,
    {
        Self {
            channels: store.clone(),
            users: store.clone(),
            targets: store.clone(),
            moderators: store.clone(),
            live_info: store.clone(),
            pronouns: store,
        }
    }
}
