// File: votebot-core/tests/test_utils/mod.rs
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::mock;
use parking_lot::Mutex;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use votebot_common::traits::repository_traits::{
    PendingRewardRepository, SubjectRepository, VoteRepository,
};
use votebot_common::traits::sink_traits::{
    IdentityResolver, ItemSink, MessageSink, PrivilegedExecutor,
};
use votebot_core::{Database, Error};
use votebot_core::models::{
    ConcreteItem, PendingReward, Placeholders, Recipient, RewardDefinition, RewardItem,
    SubjectRecord, VoteCounts, VoteStats, VoterRank,
};
use votebot_core::platforms::StandardCatalog;
use votebot_core::services::{
    EngineContext, RepositoryIdentityResolver, RewardConfig, RewardConfigStore, RewardSelector,
    SubjectRegistry, VoteService,
};

// ---------------------------------------------------------------------
// In-memory persistence
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct VoteRow {
    pub subject_id: Uuid,
    pub display_name: String,
    pub service: String,
    pub voted_at: DateTime<Utc>,
}

/// Implements all three repositories over plain vectors.
#[derive(Default)]
pub struct InMemoryStore {
    pub votes: Mutex<Vec<VoteRow>>,
    pub subjects: Mutex<Vec<SubjectRecord>>,
    pub pending: Mutex<Vec<PendingReward>>,
    pub fail_record: AtomicBool,
    pub fail_claims: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_recording(&self, fail: bool) {
        self.fail_record.store(fail, Ordering::SeqCst);
    }

    pub fn fail_claiming(&self, fail: bool) {
        self.fail_claims.store(fail, Ordering::SeqCst);
    }

    pub fn vote_count(&self) -> usize {
        self.votes.lock().len()
    }

    pub fn pending_for(&self, subject_id: Uuid) -> Vec<PendingReward> {
        self.pending
            .lock()
            .iter()
            .filter(|p| p.subject_id == subject_id)
            .cloned()
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Queues a row with a chosen timestamp, for expiry tests.
    pub fn insert_pending_at(&self, subject_id: Uuid, reward_name: &str, at: DateTime<Utc>) {
        let mut row = PendingReward::new(subject_id, reward_name, "TopList");
        row.enqueued_at = at;
        self.pending.lock().push(row);
    }

    fn upsert(&self, subject_id: Uuid, display_name: &str) {
        let now = Utc::now();
        let mut subjects = self.subjects.lock();
        match subjects.iter_mut().find(|s| s.subject_id == subject_id) {
            Some(existing) => {
                existing.display_name = display_name.to_string();
                existing.last_seen = now;
            }
            None => subjects.push(SubjectRecord {
                subject_id,
                display_name: display_name.to_string(),
                first_seen: now,
                last_seen: now,
            }),
        }
    }
}

#[async_trait]
impl VoteRepository for InMemoryStore {
    async fn record_vote(
        &self,
        subject_id: Uuid,
        display_name: &str,
        service: &str,
    ) -> Result<VoteCounts, Error> {
        if self.fail_record.load(Ordering::SeqCst) {
            return Err(Error::Persistence("votes table unavailable".into()));
        }
        self.upsert(subject_id, display_name);

        let mut votes = self.votes.lock();
        votes.push(VoteRow {
            subject_id,
            display_name: display_name.to_string(),
            service: service.to_string(),
            voted_at: Utc::now(),
        });
        let subject = votes.iter().filter(|v| v.subject_id == subject_id).count() as i64;
        Ok(VoteCounts {
            subject,
            global: votes.len() as i64,
        })
    }

    async fn subject_vote_count(&self, subject_id: Uuid) -> Result<i64, Error> {
        Ok(self
            .votes
            .lock()
            .iter()
            .filter(|v| v.subject_id == subject_id)
            .count() as i64)
    }

    async fn global_vote_count(&self) -> Result<i64, Error> {
        Ok(self.votes.lock().len() as i64)
    }

    async fn top_voters(&self, limit: i64) -> Result<Vec<VoterRank>, Error> {
        let votes = self.votes.lock();
        let mut ranks: Vec<VoterRank> = Vec::new();
        for v in votes.iter() {
            match ranks.iter_mut().find(|r| r.subject_id == v.subject_id) {
                Some(r) => r.votes += 1,
                None => ranks.push(VoterRank {
                    subject_id: v.subject_id,
                    display_name: v.display_name.clone(),
                    votes: 1,
                }),
            }
        }
        ranks.sort_by(|a, b| b.votes.cmp(&a.votes).then(a.display_name.cmp(&b.display_name)));
        ranks.truncate(limit.max(0) as usize);
        Ok(ranks)
    }

    async fn subject_vote_stats(&self, subject_id: Uuid) -> Result<Option<VoteStats>, Error> {
        let votes = self.votes.lock();
        let mine: Vec<&VoteRow> = votes.iter().filter(|v| v.subject_id == subject_id).collect();
        if mine.is_empty() {
            return Ok(None);
        }
        Ok(Some(VoteStats {
            subject_id,
            total_votes: mine.len() as i64,
            last_vote: mine.iter().map(|v| v.voted_at).max(),
        }))
    }
}

#[async_trait]
impl PendingRewardRepository for InMemoryStore {
    async fn enqueue_reward(
        &self,
        subject_id: Uuid,
        reward_name: &str,
        service: &str,
    ) -> Result<PendingReward, Error> {
        let row = PendingReward::new(subject_id, reward_name, service);
        self.pending.lock().push(row.clone());
        Ok(row)
    }

    async fn list_pending_rewards(&self, subject_id: Uuid) -> Result<Vec<PendingReward>, Error> {
        let mut rows = self.pending_for(subject_id);
        rows.sort_by_key(|p| p.enqueued_at);
        Ok(rows)
    }

    async fn delete_pending_reward(&self, pending_id: Uuid) -> Result<(), Error> {
        self.pending.lock().retain(|p| p.pending_id != pending_id);
        Ok(())
    }

    async fn claim_pending_reward(&self, pending_id: Uuid) -> Result<Option<PendingReward>, Error> {
        if self.fail_claims.load(Ordering::SeqCst) {
            return Err(Error::Persistence("pending_rewards table locked".into()));
        }
        let mut pending = self.pending.lock();
        let claimed = pending
            .iter()
            .position(|p| p.pending_id == pending_id)
            .map(|i| pending.remove(i));
        Ok(claimed)
    }

    async fn restore_pending_reward(&self, row: &PendingReward) -> Result<(), Error> {
        let mut pending = self.pending.lock();
        if !pending.iter().any(|p| p.pending_id == row.pending_id) {
            pending.push(row.clone());
        }
        Ok(())
    }

    async fn delete_expired_pending_rewards(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let mut pending = self.pending.lock();
        let before = pending.len();
        pending.retain(|p| p.enqueued_at >= cutoff);
        Ok((before - pending.len()) as u64)
    }
}

#[async_trait]
impl SubjectRepository for InMemoryStore {
    async fn upsert_subject(&self, subject_id: Uuid, display_name: &str) -> Result<(), Error> {
        self.upsert(subject_id, display_name);
        Ok(())
    }

    async fn get_subject(&self, subject_id: Uuid) -> Result<Option<SubjectRecord>, Error> {
        Ok(self
            .subjects
            .lock()
            .iter()
            .find(|s| s.subject_id == subject_id)
            .cloned())
    }

    async fn find_subject_id_by_name(&self, display_name: &str) -> Result<Option<Uuid>, Error> {
        let wanted = display_name.to_lowercase();
        Ok(self
            .subjects
            .lock()
            .iter()
            .filter(|s| s.display_name.to_lowercase() == wanted)
            .max_by_key(|s| s.last_seen)
            .map(|s| s.subject_id))
    }

    async fn list_all_known_subject_ids(&self) -> Result<Vec<Uuid>, Error> {
        Ok(self.subjects.lock().iter().map(|s| s.subject_id).collect())
    }
}

// ---------------------------------------------------------------------
// Host sinks
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub recipient: Recipient,
    pub key: String,
    pub placeholders: Placeholders,
}

/// Records every message, grant and command the engine emits.
#[derive(Default)]
pub struct SpySink {
    pub messages: Mutex<Vec<SentMessage>>,
    pub grants: Mutex<Vec<(Uuid, ConcreteItem)>>,
    pub commands: Mutex<Vec<String>>,
    pub fail_materials: Mutex<HashSet<String>>,
}

impl SpySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_grants_of(&self, material: &str) {
        self.fail_materials.lock().insert(material.to_string());
    }

    pub fn with_key(&self, key: &str) -> Vec<SentMessage> {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.key == key)
            .cloned()
            .collect()
    }

    pub fn broadcasts(&self) -> Vec<SentMessage> {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.recipient == Recipient::Broadcast)
            .cloned()
            .collect()
    }

    pub fn grants_for(&self, subject_id: Uuid) -> Vec<ConcreteItem> {
        self.grants
            .lock()
            .iter()
            .filter(|(id, _)| *id == subject_id)
            .map(|(_, item)| item.clone())
            .collect()
    }

    pub fn grant_count(&self) -> usize {
        self.grants.lock().len()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
        self.grants.lock().clear();
        self.commands.lock().clear();
    }
}

#[async_trait]
impl MessageSink for SpySink {
    async fn notify(
        &self,
        recipient: Recipient,
        template_key: &str,
        placeholders: &Placeholders,
    ) -> Result<(), Error> {
        self.messages.lock().push(SentMessage {
            recipient,
            key: template_key.to_string(),
            placeholders: placeholders.clone(),
        });
        Ok(())
    }
}

#[async_trait]
impl ItemSink for SpySink {
    async fn grant_item(&self, subject_id: Uuid, item: &ConcreteItem) -> Result<(), Error> {
        if self.fail_materials.lock().contains(&item.material) {
            return Err(Error::Delivery(format!("inventory rejected {}", item.material)));
        }
        self.grants.lock().push((subject_id, item.clone()));
        Ok(())
    }
}

#[async_trait]
impl PrivilegedExecutor for SpySink {
    async fn run_privileged_command(&self, command: &str) -> Result<(), Error> {
        self.commands.lock().push(command.to_string());
        Ok(())
    }
}

mock! {
    pub Identity {}
    #[async_trait]
    impl IdentityResolver for Identity {
        async fn resolve(&self, display_name: &str) -> Result<Uuid, Error>;
    }
}

mock! {
    pub Executor {}
    #[async_trait]
    impl PrivilegedExecutor for Executor {
        async fn run_privileged_command(&self, command: &str) -> Result<(), Error>;
    }
}

// ---------------------------------------------------------------------
// Engine assembly
// ---------------------------------------------------------------------

pub struct TestEngine {
    pub store: Arc<InMemoryStore>,
    pub spy: Arc<SpySink>,
    pub registry: Arc<SubjectRegistry>,
    pub config: Arc<RewardConfigStore>,
    pub service: Arc<VoteService>,
}

impl TestEngine {
    /// Registers a subject that is logged in right now.
    pub fn online(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.registry.mark_reachable(id, name);
        self.store.upsert(id, name);
        id
    }

    /// Registers a subject that has been seen before but is not logged in.
    pub fn offline(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.store.upsert(id, name);
        id
    }
}

pub fn engine(config: RewardConfig) -> TestEngine {
    engine_with(config, |ctx| ctx)
}

/// Builds an engine over fresh fakes; `customize` may swap collaborators.
pub fn engine_with(
    config: RewardConfig,
    customize: impl FnOnce(EngineContext) -> EngineContext,
) -> TestEngine {
    let store = Arc::new(InMemoryStore::new());
    let spy = Arc::new(SpySink::new());
    let registry = Arc::new(SubjectRegistry::new());
    let config = Arc::new(RewardConfigStore::new(config));
    let catalog = Arc::new(StandardCatalog::new());

    let ctx = EngineContext {
        registry: registry.clone(),
        config: config.clone(),
        vote_repo: store.clone(),
        pending_repo: store.clone(),
        subject_repo: store.clone(),
        identity: Arc::new(RepositoryIdentityResolver::new(store.clone())),
        messages: spy.clone(),
        items: spy.clone(),
        executor: spy.clone(),
        catalog: catalog.clone(),
    };
    let ctx = customize(ctx);
    let selector = RewardSelector::with_seed(ctx.catalog.clone(), 7);
    let service = Arc::new(VoteService::with_selector(ctx, selector));

    TestEngine {
        store,
        spy,
        registry,
        config,
        service,
    }
}

pub fn diamonds() -> RewardDefinition {
    RewardDefinition::new("diamonds", "Shiny Diamonds", vec![RewardItem::standard("diamond", 5)])
}

// ---------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------

/// Looks for `TEST_DATABASE_URL`, else `postgres://votebot@localhost/votebot_test`.
pub async fn create_test_db_pool() -> Result<Pool<Postgres>, Error> {
    let url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| "postgres://votebot@localhost/votebot_test".to_string());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;

    Ok(pool)
}

pub async fn clean_database(pool: &Pool<Postgres>) -> Result<(), Error> {
    sqlx::query(r#"
        TRUNCATE TABLE
            pending_rewards,
            vote_totals,
            votes,
            vote_subjects
        RESTART IDENTITY CASCADE;
    "#)
        .execute(pool)
        .await?;

    Ok(())
}

/// A migrated, emptied database.
pub async fn setup_test_database() -> Result<Database, Error> {
    let pool = create_test_db_pool().await?;
    let db = Database::from_pool(pool);
    db.migrate().await?;
    clean_database(db.pool()).await?;
    Ok(db)
}
