use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;
use crate::Error;
use crate::models::PendingReward;
use votebot_common::traits::repository_traits::PendingRewardRepository;

#[derive(Clone)]
pub struct PostgresPendingRewardRepository {
    pool: Pool<Postgres>,
}

impl PostgresPendingRewardRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PendingRewardRepository for PostgresPendingRewardRepository {
    async fn enqueue_reward(
        &self,
        subject_id: Uuid,
        reward_name: &str,
        service: &str,
    ) -> Result<PendingReward, Error> {
        let pending = PendingReward::new(subject_id, reward_name, service);
        sqlx::query(
            r#"
            INSERT INTO pending_rewards (
                pending_id, subject_id, reward_name, vote_service, enqueued_at
            )
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
            .bind(pending.pending_id)
            .bind(pending.subject_id)
            .bind(&pending.reward_name)
            .bind(&pending.vote_service)
            .bind(pending.enqueued_at)
            .execute(&self.pool)
            .await?;

        Ok(pending)
    }

    async fn list_pending_rewards(&self, subject_id: Uuid) -> Result<Vec<PendingReward>, Error> {
        let rows = sqlx::query_as::<_, PendingReward>(
            r#"
            SELECT pending_id, subject_id, reward_name, vote_service, enqueued_at
            FROM pending_rewards
            WHERE subject_id = $1
            ORDER BY enqueued_at ASC
            "#,
        )
            .bind(subject_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn delete_pending_reward(&self, pending_id: Uuid) -> Result<(), Error> {
        sqlx::query("DELETE FROM pending_rewards WHERE pending_id = $1")
            .bind(pending_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn claim_pending_reward(&self, pending_id: Uuid) -> Result<Option<PendingReward>, Error> {
        let row = sqlx::query_as::<_, PendingReward>(
            r#"
            DELETE FROM pending_rewards
            WHERE pending_id = $1
            RETURNING pending_id, subject_id, reward_name, vote_service, enqueued_at
            "#,
        )
            .bind(pending_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn restore_pending_reward(&self, row: &PendingReward) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO pending_rewards (
                pending_id, subject_id, reward_name, vote_service, enqueued_at
            )
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (pending_id) DO NOTHING
            "#,
        )
            .bind(row.pending_id)
            .bind(row.subject_id)
            .bind(&row.reward_name)
            .bind(&row.vote_service)
            .bind(row.enqueued_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_expired_pending_rewards(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let res = sqlx::query("DELETE FROM pending_rewards WHERE enqueued_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }
}
