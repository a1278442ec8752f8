use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use shoutbot_common::models::ShoutoutTarget;
use shoutbot_common::traits::repository_traits::ShoutoutTargetRepository;

use crate::Error;

/// Reads the aliased target columns (`target_id`, `target_enabled`, ...), so
/// the same mapper works for plain selects and for the live-channel join.
pub(crate) fn target_from_row(r: &PgRow) -> Result<ShoutoutTarget, Error> {
    Ok(ShoutoutTarget {
        id: r.try_get("target_id")?,
        channel_id: r.try_get("channel_id")?,
        target_user_id: r.try_get("target_user_id")?,
        message_template: r.try_get("message_template")?,
        enabled: r.try_get("target_enabled")?,
        last_shoutout_at: r.try_get::<Option<DateTime<Utc>>, _>("target_last_shoutout_at")?,
        created_at: r.try_get::<DateTime<Utc>, _>("target_created_at")?,
    })
}

const TARGET_COLUMNS: &str = r#"
    t.id AS target_id, t.channel_id, t.target_user_id, t.message_template,
    t.enabled AS target_enabled, t.last_shoutout_at AS target_last_shoutout_at,
    t.created_at AS target_created_at
"#;

#[derive(Clone)]
pub struct PostgresShoutoutTargetRepository {
    pool: Pool<Postgres>,
}

impl PostgresShoutoutTargetRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShoutoutTargetRepository for PostgresShoutoutTargetRepository {
    async fn get_target(
        &self,
        channel_id: &str,
        target_user_id: &str,
    ) -> Result<Option<ShoutoutTarget>, Error> {
        let sql = format!(
            "SELECT {TARGET_COLUMNS} FROM shoutout_targets t WHERE t.channel_id = $1 AND t.target_user_id = $2"
        );
        let row = sqlx::query(&sql)
            .bind(channel_id)
            .bind(target_user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(target_from_row).transpose()
    }

    async fn list_targets(&self, channel_id: &str) -> Result<Vec<ShoutoutTarget>, Error> {
        let sql = format!(
            "SELECT {TARGET_COLUMNS} FROM shoutout_targets t WHERE t.channel_id = $1 ORDER BY t.created_at"
        );
        let rows = sqlx::query(&sql)
            .bind(channel_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(target_from_row).collect()
    }

    async fn create_target(&self, target: &ShoutoutTarget) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO shoutout_targets (
                id, channel_id, target_user_id, message_template, enabled,
                last_shoutout_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
            .bind(target.id)
            .bind(&target.channel_id)
            .bind(&target.target_user_id)
            .bind(&target.message_template)
            .bind(target.enabled)
            .bind(target.last_shoutout_at)
            .bind(target.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_target(&self, channel_id: &str, target_user_id: &str) -> Result<bool, Error> {
        let res = sqlx::query(
            "DELETE FROM shoutout_targets WHERE channel_id = $1 AND target_user_id = $2",
        )
            .bind(channel_id)
            .bind(target_user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn set_target_last_shoutout(&self, target_id: Uuid, at: DateTime<Utc>) -> Result<(), Error> {
        sqlx::query("UPDATE shoutout_targets SET last_shoutout_at = $1 WHERE id = $2")
            .bind(at)
            .bind(target_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
