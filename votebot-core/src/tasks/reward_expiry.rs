// src/tasks/reward_expiry.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::services::vote_service::VoteService;

pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Spawns the sweep that deletes queued rewards older than the configured
/// horizon. First run after `initial_delay`, then every `period`.
pub fn spawn_reward_expiry_task(
    service: Arc<VoteService>,
    initial_delay: Duration,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + initial_delay, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            "Offline reward expiry scheduled (first run in {:?}, then every {:?})",
            initial_delay, period
        );

        loop {
            ticker.tick().await;
            if let Err(e) = service.expire_pending_rewards().await {
                error!("Offline reward expiry failed: {:?}", e);
            }
        }
    })
}
