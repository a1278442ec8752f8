// File: shoutbot-core/src/test_utils/helpers.rs

use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, PgConnection, Pool, Postgres};

use crate::db::Database;
use crate::Error;

const TEST_DB: &str = "shoutbot_test";

/// `TEST_DATABASE_URL`, if the environment provides a Postgres to test against.
pub fn test_database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL").ok().filter(|u| !u.is_empty())
}

/// Create the test database if it does not exist yet.
pub async fn ensure_test_database_exists() -> Result<(), Error> {
    let admin_url = std::env::var("DATABASE_ADMIN_URL")
        .unwrap_or_else(|_| "postgres://postgres@localhost/postgres".to_string());
    let mut conn = PgConnection::connect(&admin_url).await?;

    let create_db_sql = format!("CREATE DATABASE {TEST_DB};");
    match sqlx::query(&create_db_sql).execute(&mut conn).await {
        Ok(_) => tracing::info!("Created test DB '{TEST_DB}'."),
        // 42P04 => duplicate_database
        Err(e) if e.as_database_error().and_then(|d| d.code()).as_deref() == Some("42P04") => {}
        Err(e) => return Err(Error::Database(e)),
    }
    Ok(())
}

pub async fn create_test_db_pool(url: &str) -> Result<Pool<Postgres>, Error> {
    let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
    Ok(pool)
}

/// Wipes out test data so each test can start fresh.
pub async fn clean_database(pool: &Pool<Postgres>) -> Result<(), Error> {
    sqlx::query(
        r#"
        TRUNCATE TABLE
            shoutout_targets,
            channel_moderators,
            channel_live_info,
            channels,
            users,
            pronouns
        RESTART IDENTITY CASCADE;
    "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Returns a migrated, empty test DB handle, or `None` when no test
/// database is configured.
pub async fn setup_test_database() -> Result<Option<Database>, Error> {
    let Some(url) = test_database_url() else {
        return Ok(None);
    };
    if let Err(e) = ensure_test_database_exists().await {
        tracing::warn!("Could not create '{TEST_DB}': {e}");
    }

    let db = Database::from_pool(create_test_db_pool(&url).await?);
    db.migrate().await?;
    clean_database(db.pool()).await?;
    Ok(Some(db))
}
