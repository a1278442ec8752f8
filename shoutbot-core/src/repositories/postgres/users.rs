use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};

use shoutbot_common::models::{Pronoun, TokenSet, TwitchUser};
use shoutbot_common::traits::repository_traits::UserRepository;

use crate::Error;

/// Column list shared by every query that returns users. Pronoun columns come
/// from a LEFT JOIN on `pronouns p`.
pub(crate) const USER_COLUMNS: &str = r#"
    u.id, u.username, u.display_name, u.description, u.profile_image_url,
    u.offline_image_url, u.broadcaster_type, u.color, u.timezone, u.is_live,
    u.enabled, u.access_token, u.refresh_token, u.token_expiry,
    u.created_at, u.updated_at,
    p.name AS pronoun_name, p.subject AS pronoun_subject,
    p.object AS pronoun_object, p.singular AS pronoun_singular
"#;

pub(crate) fn user_from_row(r: &PgRow) -> Result<TwitchUser, Error> {
    let pronoun = match r.try_get::<Option<String>, _>("pronoun_name")? {
        Some(name) => Some(Pronoun {
            name,
            subject: r.try_get("pronoun_subject")?,
            object: r.try_get("pronoun_object")?,
            singular: r.try_get("pronoun_singular")?,
        }),
        None => None,
    };

    Ok(TwitchUser {
        id: r.try_get("id")?,
        username: r.try_get("username")?,
        display_name: r.try_get("display_name")?,
        description: r.try_get("description")?,
        profile_image_url: r.try_get("profile_image_url")?,
        offline_image_url: r.try_get("offline_image_url")?,
        broadcaster_type: r.try_get("broadcaster_type")?,
        color: r.try_get("color")?,
        timezone: r.try_get("timezone")?,
        is_live: r.try_get("is_live")?,
        enabled: r.try_get("enabled")?,
        pronoun,
        access_token: r.try_get("access_token")?,
        refresh_token: r.try_get("refresh_token")?,
        token_expiry: r.try_get::<Option<DateTime<Utc>>, _>("token_expiry")?,
        created_at: r.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: r.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: Pool<Postgres>,
}

impl PostgresUserRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn get_user(&self, user_id: &str) -> Result<Option<TwitchUser>, Error> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users u LEFT JOIN pronouns p ON p.name = u.pronoun_name WHERE u.id = $1"
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_user_by_login(&self, login: &str) -> Result<Option<TwitchUser>, Error> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users u LEFT JOIN pronouns p ON p.name = u.pronoun_name \
             WHERE LOWER(u.username) = LOWER($1) LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(login)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn upsert_user(&self, user: &TwitchUser) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, display_name, description, profile_image_url,
                offline_image_url, broadcaster_type, color, timezone, is_live,
                enabled, pronoun_name, access_token, refresh_token, token_expiry,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (id) DO UPDATE
               SET username          = EXCLUDED.username,
                   display_name      = EXCLUDED.display_name,
                   description       = EXCLUDED.description,
                   profile_image_url = EXCLUDED.profile_image_url,
                   offline_image_url = EXCLUDED.offline_image_url,
                   broadcaster_type  = EXCLUDED.broadcaster_type,
                   color             = COALESCE(EXCLUDED.color, users.color),
                   timezone          = COALESCE(EXCLUDED.timezone, users.timezone),
                   is_live           = EXCLUDED.is_live,
                   pronoun_name      = COALESCE(EXCLUDED.pronoun_name, users.pronoun_name),
                   access_token      = COALESCE(EXCLUDED.access_token, users.access_token),
                   refresh_token     = COALESCE(EXCLUDED.refresh_token, users.refresh_token),
                   token_expiry      = COALESCE(EXCLUDED.token_expiry, users.token_expiry),
                   updated_at        = EXCLUDED.updated_at
            "#,
        )
            .bind(&user.id)
            .bind(&user.username)
            .bind(&user.display_name)
            .bind(&user.description)
            .bind(&user.profile_image_url)
            .bind(&user.offline_image_url)
            .bind(&user.broadcaster_type)
            .bind(&user.color)
            .bind(&user.timezone)
            .bind(user.is_live)
            .bind(user.enabled)
            .bind(user.pronoun.as_ref().map(|p| p.name.clone()))
            .bind(&user.access_token)
            .bind(&user.refresh_token)
            .bind(user.token_expiry)
            .bind(user.created_at)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_tokens(&self, user_id: &str, tokens: &TokenSet) -> Result<(), Error> {
        let res = sqlx::query(
            r#"
            UPDATE users
            SET access_token  = $1,
                refresh_token = $2,
                token_expiry  = $3,
                updated_at    = $4
            WHERE id = $5
            "#,
        )
            .bind(&tokens.access_token)
            .bind(&tokens.refresh_token)
            .bind(tokens.expires_at)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(Error::NotFound(format!("user {user_id}")));
        }
        Ok(())
    }

    async fn list_users_with_refresh_token(&self) -> Result<Vec<TwitchUser>, Error> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users u LEFT JOIN pronouns p ON p.name = u.pronoun_name \
             WHERE u.refresh_token IS NOT NULL AND u.refresh_token <> ''"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn set_live(&self, user_id: &str, is_live: bool) -> Result<(), Error> {
        sqlx::query("UPDATE users SET is_live = $1, updated_at = $2 WHERE id = $3")
            .bind(is_live)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
