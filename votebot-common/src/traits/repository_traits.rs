use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Error;
use crate::models::{PendingReward, SubjectRecord, VoteCounts, VoteStats, VoterRank};

/// Durable vote log and the counters derived from it.
#[async_trait]
pub trait VoteRepository: Send + Sync {
    /// Appends a vote row, refreshes the subject's display name and returns
    /// the counters including this vote.
    async fn record_vote(
        &self,
        subject_id: Uuid,
        display_name: &str,
        service: &str,
    ) -> Result<VoteCounts, Error>;

    async fn subject_vote_count(&self, subject_id: Uuid) -> Result<i64, Error>;
    async fn global_vote_count(&self) -> Result<i64, Error>;

    async fn top_voters(&self, limit: i64) -> Result<Vec<VoterRank>, Error>;
    async fn subject_vote_stats(&self, subject_id: Uuid) -> Result<Option<VoteStats>, Error>;
}

/// Queue of rewards waiting for an unreachable subject.
#[async_trait]
pub trait PendingRewardRepository: Send + Sync {
    async fn enqueue_reward(
        &self,
        subject_id: Uuid,
        reward_name: &str,
        service: &str,
    ) -> Result<PendingReward, Error>;

    /// Oldest first.
    async fn list_pending_rewards(&self, subject_id: Uuid) -> Result<Vec<PendingReward>, Error>;

    /// Removes exactly one queued row.
    async fn delete_pending_reward(&self, pending_id: Uuid) -> Result<(), Error>;

    /// Removes one queued row and hands it back, or `None` if another
    /// caller already took it. Only the claimant may deliver the reward.
    async fn claim_pending_reward(&self, pending_id: Uuid) -> Result<Option<PendingReward>, Error>;

    /// Puts a claimed row back unchanged after a failed delivery.
    async fn restore_pending_reward(&self, row: &PendingReward) -> Result<(), Error>;

    /// Removes every row enqueued strictly before `cutoff`. Returns the count.
    async fn delete_expired_pending_rewards(&self, cutoff: DateTime<Utc>) -> Result<u64, Error>;
}

#[async_trait]
pub trait SubjectRepository: Send + Sync {
    /// Insert or refresh name + last_seen.
    async fn upsert_subject(&self, subject_id: Uuid, display_name: &str) -> Result<(), Error>;
    async fn get_subject(&self, subject_id: Uuid) -> Result<Option<SubjectRecord>, Error>;
    async fn find_subject_id_by_name(&self, display_name: &str) -> Result<Option<Uuid>, Error>;
    async fn list_all_known_subject_ids(&self) -> Result<Vec<Uuid>, Error>;
}
