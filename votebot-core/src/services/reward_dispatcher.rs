use std::sync::Arc;

use tracing::{error, info, warn};

use crate::Error;
use crate::models::{Actor, PendingReward, RewardDefinition, SelectedItem, Subject};
use crate::services::reward_selector::RewardSelector;
use votebot_common::traits::repository_traits::PendingRewardRepository;
use votebot_common::traits::sink_traits::{ItemSink, PrivilegedExecutor};

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Items were handed to a reachable subject.
    Delivered {
        granted: usize,
        failed: usize,
        commands_failed: usize,
    },
    /// Subject was unreachable; the whole definition was queued.
    Queued(PendingReward),
}

/// Applies a reward to one subject: immediate delivery when reachable,
/// one queued row per definition otherwise.
pub struct RewardDispatcher {
    selector: Arc<RewardSelector>,
    pending_repo: Arc<dyn PendingRewardRepository + Send + Sync>,
    items: Arc<dyn ItemSink + Send + Sync>,
    executor: Arc<dyn PrivilegedExecutor + Send + Sync>,
}

impl RewardDispatcher {
    pub fn new(
        selector: Arc<RewardSelector>,
        pending_repo: Arc<dyn PendingRewardRepository + Send + Sync>,
        items: Arc<dyn ItemSink + Send + Sync>,
        executor: Arc<dyn PrivilegedExecutor + Send + Sync>,
    ) -> Self {
        Self {
            selector,
            pending_repo,
            items,
            executor,
        }
    }

    pub async fn dispatch(
        &self,
        initiator: &Actor,
        target: &Subject,
        reward: &RewardDefinition,
        service: &str,
    ) -> Result<DispatchOutcome, Error> {
        if !target.reachable {
            let pending = self
                .pending_repo
                .enqueue_reward(target.subject_id, &reward.name, service)
                .await?;
            info!(
                "Queued reward '{}' for offline subject {} (service='{}', initiator={:?})",
                reward.name, target.subject_id, service, initiator
            );
            return Ok(DispatchOutcome::Queued(pending));
        }

        self.deliver_now(target, reward).await
    }

    /// Selects and delivers without ever queueing. Used by replay, where the
    /// subject is reachable by construction.
    pub async fn deliver_now(
        &self,
        target: &Subject,
        reward: &RewardDefinition,
    ) -> Result<DispatchOutcome, Error> {
        let selected = self.selector.select(reward).await;
        self.deliver(target, &reward.name, &selected).await
    }

    /// Grants each item, then runs its commands. A failed grant skips that
    /// item's commands but not the rest of the list. Only a list where every
    /// grant failed is reported as an error.
    pub async fn deliver(
        &self,
        target: &Subject,
        reward_name: &str,
        selected: &[SelectedItem],
    ) -> Result<DispatchOutcome, Error> {
        let mut granted = 0;
        let mut failed = 0;
        let mut commands_failed = 0;

        for sel in selected {
            if let Err(e) = self.items.grant_item(target.subject_id, &sel.item).await {
                warn!(
                    "Failed to grant {} x{} from '{}' to {}: {}",
                    sel.item.material, sel.item.quantity, reward_name, target.display_name, e
                );
                failed += 1;
                continue;
            }
            granted += 1;

            for command in sel.resolved_commands(&target.display_name) {
                if let Err(e) = self.executor.run_privileged_command(&command).await {
                    error!("Reward command '{}' failed: {}", command, e);
                    commands_failed += 1;
                }
            }
        }

        if !selected.is_empty() && granted == 0 {
            return Err(Error::Delivery(format!(
                "no item of reward '{}' could be granted to {}",
                reward_name, target.subject_id
            )));
        }

        info!(
            "Delivered reward '{}' to {} ({} granted, {} failed)",
            reward_name, target.display_name, granted, failed
        );
        Ok(DispatchOutcome::Delivered {
            granted,
            failed,
            commands_failed,
        })
    }
}
