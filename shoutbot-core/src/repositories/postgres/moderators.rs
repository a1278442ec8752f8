use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use shoutbot_common::models::ChannelModerator;
use shoutbot_common::traits::repository_traits::ModeratorRepository;

use crate::Error;

#[derive(Clone)]
pub struct PostgresModeratorRepository {
    pool: Pool<Postgres>,
}

impl PostgresModeratorRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ModeratorRepository for PostgresModeratorRepository {
    async fn is_moderator(&self, channel_id: &str, user_id: &str) -> Result<bool, Error> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM channel_moderators WHERE channel_id = $1 AND user_id = $2
            ) AS found
            "#,
        )
            .bind(channel_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("found")?)
    }

    async fn upsert_moderator(&self, moderator: &ChannelModerator) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO channel_moderators (channel_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (channel_id, user_id) DO NOTHING
            "#,
        )
            .bind(&moderator.channel_id)
            .bind(&moderator.user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_moderators(&self, channel_id: &str) -> Result<Vec<ChannelModerator>, Error> {
        let rows = sqlx::query_as::<_, ChannelModerator>(
            "SELECT channel_id, user_id FROM channel_moderators WHERE channel_id = $1",
        )
            .bind(channel_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
