use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use shoutbot_common::models::Pronoun;
use shoutbot_common::traits::repository_traits::PronounRepository;

use crate::Error;

#[derive(Clone)]
pub struct PostgresPronounRepository {
    pool: Pool<Postgres>,
}

impl PostgresPronounRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PronounRepository for PostgresPronounRepository {
    async fn upsert_pronoun(&self, pronoun: &Pronoun) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO pronouns (name, subject, object, singular)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO UPDATE
               SET subject  = EXCLUDED.subject,
                   object   = EXCLUDED.object,
                   singular = EXCLUDED.singular
            "#,
        )
            .bind(&pronoun.name)
            .bind(&pronoun.subject)
            .bind(&pronoun.object)
            .bind(pronoun.singular)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_pronoun(&self, name: &str) -> Result<Option<Pronoun>, Error> {
        let row = sqlx::query_as::<_, Pronoun>(
            "SELECT name, subject, object, singular FROM pronouns WHERE name = $1",
        )
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}
