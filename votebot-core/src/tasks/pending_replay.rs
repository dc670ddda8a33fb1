// src/tasks/pending_replay.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::error;
use uuid::Uuid;

use crate::services::vote_service::VoteService;

/// Marks the subject reachable right away and drains its queued rewards
/// in the background after `delay`, which gives the host a moment to finish
/// the login. Vote ingestion never waits on it.
pub fn spawn_pending_reward_replay(
    service: Arc<VoteService>,
    subject_id: Uuid,
    display_name: String,
    delay: Duration,
) -> JoinHandle<()> {
    service
        .context()
        .registry
        .mark_reachable(subject_id, &display_name);

    tokio::spawn(async move {
        sleep(delay).await;
        if let Err(e) = service.subject_connected(subject_id, &display_name).await {
            error!(
                "Failed to replay queued rewards for {} ({}): {:?}",
                display_name, subject_id, e
            );
        }
    })
}
