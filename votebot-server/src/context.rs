// votebot-server/src/context.rs

use std::sync::Arc;

use tracing::info;

use votebot_core::platforms::{ConsoleBridge, MojangIdentityResolver, StandardCatalog};
use votebot_core::repositories::{
    PostgresPendingRewardRepository, PostgresSubjectRepository, PostgresVoteRepository,
};
use votebot_core::services::{
    select_identity_resolver, EngineContext, RewardConfig, RewardConfigStore, SubjectRegistry,
    VoteService,
};
use votebot_common::traits::sink_traits::IdentityResolver;
use votebot_core::{Database, Error};

/// Loads the reward config (or an empty one) and wires every collaborator
/// against Postgres and the console bridge.
pub async fn build_vote_service(
    db: &Database,
    config_path: Option<&str>,
    offline_identity: bool,
) -> Result<Arc<VoteService>, Error> {
    let config = match config_path {
        Some(path) => {
            let store = RewardConfigStore::load_from_path(path).await?;
            info!("Loaded reward config from {}", path);
            store
        }
        None => {
            info!("No reward config given; running with an empty trigger table.");
            RewardConfigStore::new(RewardConfig::default())
        }
    };
    let config = Arc::new(config);

    let snapshot = config.snapshot();
    info!(
        "Triggers: [{}], rewards: [{}], queued rewards expire after {} day(s)",
        snapshot.trigger_names().join(", "),
        snapshot.reward_names().join(", "),
        snapshot.rewards_expire_days
    );

    let subject_repo = Arc::new(PostgresSubjectRepository::new(db.pool().clone()));

    let network: Option<Arc<dyn IdentityResolver + Send + Sync>> = if offline_identity {
        None
    } else {
        Some(Arc::new(MojangIdentityResolver::new()?))
    };
    let identity = select_identity_resolver(network, subject_repo.clone());

    let bridge = Arc::new(ConsoleBridge::new(config.clone()));

    let ctx = EngineContext {
        registry: Arc::new(SubjectRegistry::new()),
        config,
        vote_repo: Arc::new(PostgresVoteRepository::new(db.pool().clone())),
        pending_repo: Arc::new(PostgresPendingRewardRepository::new(db.pool().clone())),
        subject_repo,
        identity,
        messages: bridge.clone(),
        items: bridge.clone(),
        executor: bridge,
        catalog: Arc::new(StandardCatalog::new()),
    };

    Ok(Arc::new(VoteService::new(ctx)))
}
