use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};

use shoutbot_common::models::{Channel, LiveChannel, ShoutoutCandidate};
use shoutbot_common::traits::repository_traits::ChannelRepository;

use crate::Error;
use super::live_info::live_info_from_row;
use super::targets::target_from_row;
use super::users::{user_from_row, USER_COLUMNS};

const CHANNEL_COLUMNS: &str = r#"
    c.id, c.name, c.enabled, c.shoutout_template, c.shoutout_interval_minutes,
    c.last_shoutout_at, c.created_at, c.updated_at
"#;

fn channel_from_row(r: &PgRow) -> Result<Channel, Error> {
    Ok(Channel {
        id: r.try_get("id")?,
        name: r.try_get("name")?,
        enabled: r.try_get("enabled")?,
        shoutout_template: r.try_get("shoutout_template")?,
        shoutout_interval_minutes: r.try_get("shoutout_interval_minutes")?,
        last_shoutout_at: r.try_get::<Option<DateTime<Utc>>, _>("last_shoutout_at")?,
        created_at: r.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: r.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

#[derive(Clone)]
pub struct PostgresChannelRepository {
    pool: Pool<Postgres>,
}

impl PostgresChannelRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChannelRepository for PostgresChannelRepository {
    async fn get_channel(&self, channel_id: &str) -> Result<Option<Channel>, Error> {
        let sql = format!("SELECT {CHANNEL_COLUMNS} FROM channels c WHERE c.id = $1");
        let row = sqlx::query(&sql)
            .bind(channel_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(channel_from_row).transpose()
    }

    async fn get_channel_by_name(&self, name: &str) -> Result<Option<Channel>, Error> {
        let sql = format!("SELECT {CHANNEL_COLUMNS} FROM channels c WHERE c.name = LOWER($1)");
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(channel_from_row).transpose()
    }

    async fn create_channel(&self, channel: &Channel) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO channels (
                id, name, enabled, shoutout_template, shoutout_interval_minutes,
                last_shoutout_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
            .bind(&channel.id)
            .bind(&channel.name)
            .bind(channel.enabled)
            .bind(&channel.shoutout_template)
            .bind(channel.shoutout_interval_minutes)
            .bind(channel.last_shoutout_at)
            .bind(channel.created_at)
            .bind(channel.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_channel(&self, channel: &Channel) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE channels
            SET name                      = $1,
                enabled                   = $2,
                shoutout_template         = $3,
                shoutout_interval_minutes = $4,
                last_shoutout_at          = $5,
                updated_at                = $6
            WHERE id = $7
            "#,
        )
            .bind(&channel.name)
            .bind(channel.enabled)
            .bind(&channel.shoutout_template)
            .bind(channel.shoutout_interval_minutes)
            .bind(channel.last_shoutout_at)
            .bind(Utc::now())
            .bind(&channel.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_channel_enabled(&self, channel_id: &str, enabled: bool) -> Result<(), Error> {
        let res = sqlx::query("UPDATE channels SET enabled = $1, updated_at = $2 WHERE id = $3")
            .bind(enabled)
            .bind(Utc::now())
            .bind(channel_id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound(format!("channel {channel_id}")));
        }
        Ok(())
    }

    async fn list_enabled_channels(&self) -> Result<Vec<Channel>, Error> {
        let sql = format!("SELECT {CHANNEL_COLUMNS} FROM channels c WHERE c.enabled ORDER BY c.name");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(channel_from_row).collect()
    }

    async fn list_live_channels_with_targets(&self) -> Result<Vec<LiveChannel>, Error> {
        let sql = format!(
            "SELECT {CHANNEL_COLUMNS} FROM channels c JOIN users b ON b.id = c.id \
             WHERE c.enabled AND b.is_live ORDER BY c.name"
        );
        let channel_rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let channels: Vec<Channel> = channel_rows
            .iter()
            .map(channel_from_row)
            .collect::<Result<_, _>>()?;
        if channels.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = channels.iter().map(|c| c.id.clone()).collect();
        let sql = format!(
            r#"
            SELECT
                t.id AS target_id, t.channel_id, t.target_user_id, t.message_template,
                t.enabled AS target_enabled, t.last_shoutout_at AS target_last_shoutout_at,
                t.created_at AS target_created_at,
                {USER_COLUMNS},
                li.broadcaster_id, li.language, li.game_id, li.game_name, li.title,
                li.tags, li.updated_at AS live_updated_at
            FROM shoutout_targets t
            JOIN users u ON u.id = t.target_user_id
            LEFT JOIN pronouns p ON p.name = u.pronoun_name
            LEFT JOIN channel_live_info li ON li.broadcaster_id = t.target_user_id
            WHERE t.enabled AND t.channel_id = ANY($1)
            "#
        );
        let target_rows = sqlx::query(&sql)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;

        let mut by_channel: HashMap<String, Vec<ShoutoutCandidate>> = HashMap::new();
        for r in &target_rows {
            let target = target_from_row(r)?;
            let user = user_from_row(r)?;
            let live_info = match r.try_get::<Option<String>, _>("broadcaster_id")? {
                Some(_) => Some(live_info_from_row(r)?),
                None => None,
            };
            by_channel
                .entry(target.channel_id.clone())
                .or_default()
                .push(ShoutoutCandidate { target, user, live_info });
        }

        Ok(channels
            .into_iter()
            .map(|channel| {
                let candidates = by_channel.remove(&channel.id).unwrap_or_default();
                LiveChannel { channel, candidates }
            })
            .collect())
    }

    async fn set_channel_last_shoutout(
        &self,
        channel_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), Error> {
        sqlx::query("UPDATE channels SET last_shoutout_at = $1, updated_at = $2 WHERE id = $3")
            .bind(at)
            .bind(Utc::now())
            .bind(channel_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
