use std::sync::Arc;

use crate::services::reward_config::RewardConfigStore;
use crate::services::subject_registry::SubjectRegistry;
use votebot_common::traits::repository_traits::{
    PendingRewardRepository, SubjectRepository, VoteRepository,
};
use votebot_common::traits::sink_traits::{
    IdentityResolver, ItemCatalog, ItemSink, MessageSink, PrivilegedExecutor,
};

/// Everything the vote engine talks to, bundled so it can be built once
/// at startup and swapped out wholesale in tests.
#[derive(Clone)]
pub struct EngineContext {
    pub registry: Arc<SubjectRegistry>,
    pub config: Arc<RewardConfigStore>,
    pub vote_repo: Arc<dyn VoteRepository + Send + Sync>,
    pub pending_repo: Arc<dyn PendingRewardRepository + Send + Sync>,
    pub subject_repo: Arc<dyn SubjectRepository + Send + Sync>,
    pub identity: Arc<dyn IdentityResolver + Send + Sync>,
    pub messages: Arc<dyn MessageSink + Send + Sync>,
    pub items: Arc<dyn ItemSink + Send + Sync>,
    pub executor: Arc<dyn PrivilegedExecutor + Send + Sync>,
    pub catalog: Arc<dyn ItemCatalog + Send + Sync>,
}
