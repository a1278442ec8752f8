use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};

use shoutbot_common::models::ChannelLiveInfo;
use shoutbot_common::traits::repository_traits::ChannelInfoRepository;

use crate::Error;

pub(crate) fn live_info_from_row(r: &PgRow) -> Result<ChannelLiveInfo, Error> {
    Ok(ChannelLiveInfo {
        broadcaster_id: r.try_get("broadcaster_id")?,
        language: r.try_get("language")?,
        game_id: r.try_get("game_id")?,
        game_name: r.try_get("game_name")?,
        title: r.try_get("title")?,
        tags: r.try_get::<Vec<String>, _>("tags")?,
        updated_at: r.try_get::<Option<DateTime<Utc>>, _>("live_updated_at")?,
    })
}

#[derive(Clone)]
pub struct PostgresChannelInfoRepository {
    pool: Pool<Postgres>,
}

impl PostgresChannelInfoRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChannelInfoRepository for PostgresChannelInfoRepository {
    async fn get_live_info(&self, broadcaster_id: &str) -> Result<Option<ChannelLiveInfo>, Error> {
        let row = sqlx::query(
            r#"
            SELECT broadcaster_id, language, game_id, game_name, title, tags,
                   updated_at AS live_updated_at
            FROM channel_live_info
            WHERE broadcaster_id = $1
            "#,
        )
            .bind(broadcaster_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(live_info_from_row).transpose()
    }

    async fn upsert_live_info(&self, info: &ChannelLiveInfo) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO channel_live_info (
                broadcaster_id, language, game_id, game_name, title, tags, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (broadcaster_id) DO UPDATE
               SET language   = EXCLUDED.language,
                   game_id    = EXCLUDED.game_id,
                   game_name  = EXCLUDED.game_name,
                   title      = EXCLUDED.title,
                   tags       = EXCLUDED.tags,
                   updated_at = EXCLUDED.updated_at
            "#,
        )
            .bind(&info.broadcaster_id)
            .bind(&info.language)
            .bind(&info.game_id)
            .bind(&info.game_name)
            .bind(&info.title)
            .bind(&info.tags)
            .bind(info.updated_at.unwrap_or_else(Utc::now))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
