use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;
use crate::Error;
use crate::models::{VoteCounts, VoteStats, VoterRank};
use votebot_common::traits::repository_traits::VoteRepository;

#[derive(Clone)]
pub struct PostgresVoteRepository {
    pool: Pool<Postgres>,
}

impl PostgresVoteRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VoteRepository for PostgresVoteRepository {
    async fn record_vote(
        &self,
        subject_id: Uuid,
        display_name: &str,
        service: &str,
    ) -> Result<VoteCounts, Error> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

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
            .bind(now)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO votes (vote_id, subject_id, display_name, vote_service, voted_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
            .bind(Uuid::new_v4())
            .bind(subject_id)
            .bind(display_name)
            .bind(service)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        let subject: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE subject_id = $1")
            .bind(subject_id)
            .fetch_one(&mut *tx)
            .await?;
        // The counter row lock orders concurrent votes; COUNT(*) would not
        // see inserts that are still uncommitted.
        let global: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO vote_totals (id, total)
            VALUES (1, 1)
            ON CONFLICT (id) DO UPDATE
               SET total = vote_totals.total + 1
            RETURNING total
            "#,
        )
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(VoteCounts { subject, global })
    }

    async fn subject_vote_count(&self, subject_id: Uuid) -> Result<i64, Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE subject_id = $1")
            .bind(subject_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn global_vote_count(&self) -> Result<i64, Error> {
        let count: Option<i64> = sqlx::query_scalar("SELECT total FROM vote_totals WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(count.unwrap_or(0))
    }

    async fn top_voters(&self, limit: i64) -> Result<Vec<VoterRank>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT v.subject_id, s.display_name, COUNT(*) AS votes
            FROM votes v
            JOIN vote_subjects s ON s.subject_id = v.subject_id
            GROUP BY v.subject_id, s.display_name
            ORDER BY votes DESC, s.display_name ASC
            LIMIT $1
            "#,
        )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let mut result = Vec::new();
        for row in rows {
            result.push(VoterRank {
                subject_id: row.try_get("subject_id")?,
                display_name: row.try_get("display_name")?,
                votes: row.try_get("votes")?,
            });
        }
        Ok(result)
    }

    async fn subject_vote_stats(&self, subject_id: Uuid) -> Result<Option<VoteStats>, Error> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total_votes, MAX(voted_at) AS last_vote
            FROM votes
            WHERE subject_id = $1
            "#,
        )
            .bind(subject_id)
            .fetch_one(&self.pool)
            .await?;

        let total_votes: i64 = row.try_get("total_votes")?;
        if total_votes == 0 {
            return Ok(None);
        }
        let last_vote: Option<DateTime<Utc>> = row.try_get("last_vote")?;
        Ok(Some(VoteStats { subject_id, total_votes, last_vote }))
    }
}
