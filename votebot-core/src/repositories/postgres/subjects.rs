use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;
use crate::Error;
use crate::models::SubjectRecord;
use votebot_common::traits::repository_traits::SubjectRepository;

#[derive(Clone)]
pub struct PostgresSubjectRepository {
    pool: Pool<Postgres>,
}

impl PostgresSubjectRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubjectRepository for PostgresSubjectRepository {
    async fn upsert_subject(&self, subject_id: Uuid, display_name: &str) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO vote_subjects (subject_id, display_name, first_seen, last_seen)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (subject_id) DO UPDATE
               SET display_name = EXCLUDED.display_name,
                   last_seen = EXCLUDED.last_seen
            "#,
        )
            .bind(subject_id)
            .bind(display_name)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_subject(&self, subject_id: Uuid) -> Result<Option<SubjectRecord>, Error> {
        let row = sqlx::query_as::<_, SubjectRecord>(
            r#"
            SELECT subject_id, display_name, first_seen, last_seen
            FROM vote_subjects
            WHERE subject_id = $1
            "#,
        )
            .bind(subject_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_subject_id_by_name(&self, display_name: &str) -> Result<Option<Uuid>, Error> {
        // Names are not unique over time; prefer whoever used it most recently.
        let id: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT subject_id
            FROM vote_subjects
            WHERE LOWER(display_name) = LOWER($1)
            ORDER BY last_seen DESC
            LIMIT 1
            "#,
        )
            .bind(display_name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    async fn list_all_known_subject_ids(&self) -> Result<Vec<Uuid>, Error> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT subject_id FROM vote_subjects ORDER BY first_seen ASC",
        )
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}
