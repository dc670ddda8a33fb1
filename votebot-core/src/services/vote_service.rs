use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::Error;
use crate::models::{
    placeholders, Actor, Placeholders, Recipient, RewardDefinition, Subject, SubjectRef,
    TriggerRule, TriggerScope, VoteCounts, VoteEvent, VoteStats, VoterRank, ADMIN_SERVICE,
};
use crate::services::engine_context::EngineContext;
use crate::services::reward_config::RewardConfig;
use crate::services::reward_dispatcher::{DispatchOutcome, RewardDispatcher};
use crate::services::reward_selector::RewardSelector;
use crate::services::trigger_evaluator;

/// What happened to one vote.
#[derive(Debug, Clone)]
pub struct VoteOutcome {
    pub subject_id: Uuid,
    pub counts: VoteCounts,
    /// Names of the rules that fired, in table order.
    pub fired: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub delivered: usize,
    /// Rows whose reward no longer exists; deleted without delivery.
    pub dropped: usize,
    /// Rows left in the queue because delivery failed.
    pub kept: usize,
}

/// Returns the enqueue time before which queued rewards are stale. Horizons
/// past the calendar range clamp to the earliest representable time.
pub fn expiry_cutoff(now: DateTime<Utc>, expire_days: u32) -> DateTime<Utc> {
    TimeDelta::try_days(i64::from(expire_days))
        .and_then(|horizon| now.checked_sub_signed(horizon))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Records votes, evaluates the trigger table and hands out rewards.
pub struct VoteService {
    ctx: EngineContext,
    dispatcher: RewardDispatcher,
}

impl VoteService {
    pub fn new(ctx: EngineContext) -> Self {
        let selector = RewardSelector::new(ctx.catalog.clone());
        Self::with_selector(ctx, selector)
    }

    pub fn with_selector(ctx: EngineContext, selector: RewardSelector) -> Self {
        let dispatcher = RewardDispatcher::new(
            Arc::new(selector),
            ctx.pending_repo.clone(),
            ctx.items.clone(),
            ctx.executor.clone(),
        );
        Self { ctx, dispatcher }
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    // ------------------------------------------------------------------
    // Vote pipeline
    // ------------------------------------------------------------------

    /// Resolve, record, evaluate, dispatch.
    ///
    /// Nothing is evaluated unless the vote made it into storage. Failures
    /// while dispatching one reward are logged and do not stop the others.
    pub async fn handle_vote(&self, event: VoteEvent) -> Result<VoteOutcome, Error> {
        let config = self.ctx.config.snapshot();

        let target = match self.resolve_target(&event.target).await {
            Ok(t) => t,
            Err(e) => {
                warn!("Vote from '{}' not recorded: {}", event.service, e);
                let label = event.target.label();
                self.notify_initiator(
                    &event.source,
                    "player_not_found",
                    placeholders(&[("player", &label)]),
                )
                .await;
                return Err(e);
            }
        };

        let counts = match self
            .ctx
            .vote_repo
            .record_vote(target.subject_id, &target.display_name, &event.service)
            .await
        {
            Ok(c) => c,
            Err(e) => {
                error!("Error adding vote for {}: {}", target.display_name, e);
                self.notify_initiator(
                    &event.source,
                    "vote_fail",
                    placeholders(&[("player", &target.display_name), ("service", &event.service)]),
                )
                .await;
                self.ctx.registry.release_if_unreachable(target.subject_id);
                return Err(e);
            }
        };

        info!(
            "Recorded vote for {} via '{}' (subject={}, global={})",
            target.display_name, event.service, counts.subject, counts.global
        );
        self.announce_vote(&event, &target).await;

        let fired = trigger_evaluator::firing_rules(&config.triggers, counts);
        let fired_names = fired.iter().map(|r| r.name.clone()).collect::<Vec<_>>();
        for rule in fired {
            debug!("Executing trigger '{}'", rule.name);
            self.execute_trigger(&event, &target, rule, &config, counts).await;
        }

        self.ctx.registry.release_if_unreachable(target.subject_id);

        Ok(VoteOutcome {
            subject_id: target.subject_id,
            counts,
            fired: fired_names,
        })
    }

    async fn announce_vote(&self, event: &VoteEvent, target: &Subject) {
        if let Some(initiator_id) = event.source.subject_id() {
            if initiator_id != target.subject_id && self.ctx.registry.is_reachable(initiator_id) {
                self.notify(
                    Recipient::Subject(initiator_id),
                    "vote_success",
                    placeholders(&[("player", &target.display_name), ("service", &event.service)]),
                )
                .await;
            }
        }

        if target.reachable {
            self.notify(
                Recipient::Subject(target.subject_id),
                "vote_success_player",
                placeholders(&[("service", &event.service)]),
            )
            .await;
        }

        if !event.source.is_admin() {
            self.notify(
                Recipient::Broadcast,
                "vote_success_broadcast",
                placeholders(&[("player", &target.display_name), ("service", &event.service)]),
            )
            .await;
        }
    }

    async fn execute_trigger(
        &self,
        event: &VoteEvent,
        target: &Subject,
        rule: &TriggerRule,
        config: &RewardConfig,
        counts: VoteCounts,
    ) {
        match rule.scope {
            TriggerScope::Subject => {
                for reward_name in &rule.rewards {
                    self.dispatch_named(&event.source, target, config, reward_name, &event.service)
                        .await;
                }

                let ph = trigger_placeholders(&target.display_name, counts.subject, &event.service);
                if !event.source.is_admin() {
                    if let Some(key) = &rule.broadcast_message {
                        self.notify(Recipient::Broadcast, key, ph.clone()).await;
                    }
                }
                if target.reachable {
                    if let Some(key) = &rule.subject_message {
                        self.notify(Recipient::Subject(target.subject_id), key, ph).await;
                    }
                }
            }
            TriggerScope::Global => {
                let ids = self.all_known_subject_ids().await;
                info!("Global trigger '{}' delivering to {} subject(s)", rule.name, ids.len());

                for subject_id in ids {
                    let subject = self.subject_for_delivery(subject_id);
                    for reward_name in &rule.rewards {
                        self.dispatch_named(&event.source, &subject, config, reward_name, &event.service)
                            .await;
                    }
                    if subject.reachable {
                        if let Some(key) = &rule.subject_message {
                            let ph = trigger_placeholders(&subject.display_name, counts.global, &event.service);
                            self.notify(Recipient::Subject(subject_id), key, ph).await;
                        }
                    }
                }

                if let Some(key) = &rule.broadcast_message {
                    let ph = trigger_placeholders(&target.display_name, counts.global, &event.service);
                    self.notify(Recipient::Broadcast, key, ph).await;
                }
            }
        }
    }

    /// Stored subjects plus anyone live in the registry that storage has not
    /// caught up with yet. Taken once; logins during delivery are not seen.
    async fn all_known_subject_ids(&self) -> Vec<Uuid> {
        let mut ids = match self.ctx.subject_repo.list_all_known_subject_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                error!("Could not list known subjects: {}", e);
                Vec::new()
            }
        };
        let mut seen: HashSet<Uuid> = ids.iter().copied().collect();
        for id in self.ctx.registry.snapshot_ids() {
            if seen.insert(id) {
                ids.push(id);
            }
        }
        ids
    }

    /// The live entry if there is one, otherwise an unreachable stand-in that
    /// is never inserted into the registry.
    fn subject_for_delivery(&self, subject_id: Uuid) -> Subject {
        self.ctx
            .registry
            .get(subject_id)
            .unwrap_or_else(|| Subject::offline(subject_id, &subject_id.to_string()))
    }

    async fn dispatch_named(
        &self,
        initiator: &Actor,
        target: &Subject,
        config: &RewardConfig,
        reward_name: &str,
        service: &str,
    ) {
        let Some(reward) = config.reward(reward_name) else {
            debug!("{}", Error::DanglingReference(reward_name.to_string()));
            return;
        };
        if let Err(e) = self.dispatcher.dispatch(initiator, target, reward, service).await {
            error!(
                "Reward '{}' for {} failed: {}",
                reward_name, target.subject_id, e
            );
        }
    }

    // ------------------------------------------------------------------
    // Manual grants
    // ------------------------------------------------------------------

    /// Operator grant of one named reward, queued if the target is offline.
    pub async fn give_reward(
        &self,
        initiator: Actor,
        target: SubjectRef,
        reward_name: &str,
    ) -> Result<DispatchOutcome, Error> {
        let config = self.ctx.config.snapshot();
        let reward: RewardDefinition = config
            .reward(reward_name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("reward '{}'", reward_name)))?;

        let subject = match self.resolve_target(&target).await {
            Ok(s) => s,
            Err(e) => {
                let label = target.label();
                self.notify_initiator(&initiator, "player_not_found", placeholders(&[("player", &label)]))
                    .await;
                return Err(e);
            }
        };

        let outcome = self
            .dispatcher
            .dispatch(&initiator, &subject, &reward, ADMIN_SERVICE)
            .await;
        self.ctx.registry.release_if_unreachable(subject.subject_id);
        let outcome = outcome?;

        self.notify_initiator(
            &initiator,
            "give_reward_success",
            placeholders(&[("player", &subject.display_name), ("reward", &reward.display_name)]),
        )
        .await;
        if subject.reachable {
            self.notify(
                Recipient::Subject(subject.subject_id),
                "give_reward_success_player",
                placeholders(&[("reward", &reward.display_name)]),
            )
            .await;
        }

        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Reachability and replay
    // ------------------------------------------------------------------

    /// Marks the subject reachable, refreshes its stored name and drains its
    /// queued rewards.
    pub async fn subject_connected(
        &self,
        subject_id: Uuid,
        display_name: &str,
    ) -> Result<ReplaySummary, Error> {
        self.ctx.registry.mark_reachable(subject_id, display_name);
        if let Err(e) = self.ctx.subject_repo.upsert_subject(subject_id, display_name).await {
            warn!("Could not refresh subject {} ({}): {}", display_name, subject_id, e);
        }
        self.replay_pending_rewards(subject_id).await
    }

    pub fn subject_disconnected(&self, subject_id: Uuid) {
        self.ctx.registry.remove(subject_id);
    }

    /// Delivers every queued reward for a reachable subject using the reward
    /// definitions configured right now. Each row is claimed before delivery
    /// and restored if delivery fails; rows naming a reward that no longer
    /// exists are dropped.
    pub async fn replay_pending_rewards(&self, subject_id: Uuid) -> Result<ReplaySummary, Error> {
        let mut summary = ReplaySummary::default();

        let subject = match self.ctx.registry.get(subject_id) {
            Some(s) if s.reachable => s,
            _ => {
                debug!("Subject {} not reachable; leaving queued rewards", subject_id);
                return Ok(summary);
            }
        };

        let Some(_guard) = self.ctx.registry.try_begin_replay(subject_id) else {
            debug!("Replay already running for {}", subject_id);
            return Ok(summary);
        };

        let config = self.ctx.config.snapshot();
        let pending = self.ctx.pending_repo.list_pending_rewards(subject_id).await?;

        for row in pending {
            let Some(reward) = config.reward(&row.reward_name) else {
                info!(
                    "Dropping queued reward '{}' for {}: no longer configured",
                    row.reward_name, subject.display_name
                );
                if let Err(e) = self.ctx.pending_repo.delete_pending_reward(row.pending_id).await {
                    error!("Failed to drop queued reward {}: {}", row.pending_id, e);
                }
                summary.dropped += 1;
                continue;
            };

            // A claimed row is out of the queue until a failed delivery
            // restores it.
            let row = match self.ctx.pending_repo.claim_pending_reward(row.pending_id).await {
                Ok(Some(claimed)) => claimed,
                Ok(None) => {
                    debug!("Queued reward {} already taken", row.pending_id);
                    continue;
                }
                Err(e) => {
                    warn!(
                        "Keeping queued reward '{}' for {}: claim failed: {}",
                        row.reward_name, subject.display_name, e
                    );
                    summary.kept += 1;
                    continue;
                }
            };

            match self.dispatcher.deliver_now(&subject, reward).await {
                Ok(_) => {
                    summary.delivered += 1;
                    self.notify(
                        Recipient::Subject(subject_id),
                        "give_reward_success_player",
                        placeholders(&[("reward", &reward.display_name)]),
                    )
                    .await;
                }
                Err(e) => {
                    warn!(
                        "Keeping queued reward '{}' for {}: {}",
                        row.reward_name, subject.display_name, e
                    );
                    if let Err(e) = self.ctx.pending_repo.restore_pending_reward(&row).await {
                        error!(
                            "Queued reward {} ('{}') for {} could not be put back: {}",
                            row.pending_id, row.reward_name, subject.display_name, e
                        );
                    }
                    summary.kept += 1;
                }
            }
        }

        if summary != ReplaySummary::default() {
            info!(
                "Replayed queued rewards for {}: {} delivered, {} dropped, {} kept",
                subject.display_name, summary.delivered, summary.dropped, summary.kept
            );
        }
        Ok(summary)
    }

    // ------------------------------------------------------------------
    // Expiry
    // ------------------------------------------------------------------

    /// Deletes queued rewards older than the configured horizon.
    pub async fn expire_pending_rewards(&self) -> Result<u64, Error> {
        let days = self.ctx.config.snapshot().rewards_expire_days;
        self.expire_pending_rewards_before(expiry_cutoff(Utc::now(), days)).await
    }

    pub async fn expire_pending_rewards_before(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let deleted = self.ctx.pending_repo.delete_expired_pending_rewards(cutoff).await?;
        info!("Cleared {} old offline reward(s) queued before {}", deleted, cutoff);
        Ok(deleted)
    }

    // ------------------------------------------------------------------
    // Stats
    // ------------------------------------------------------------------

    pub async fn top_voters(&self, limit: i64) -> Result<Vec<VoterRank>, Error> {
        self.ctx.vote_repo.top_voters(limit).await
    }

    pub async fn subject_stats(&self, target: &SubjectRef) -> Result<Option<VoteStats>, Error> {
        let subject_id = match target {
            SubjectRef::Id { subject_id, .. } => *subject_id,
            SubjectRef::Name(name) => self.ctx.identity.resolve(name).await?,
        };
        self.ctx.vote_repo.subject_vote_stats(subject_id).await
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Fails closed: a name that cannot be resolved never becomes a guess.
    async fn resolve_target(&self, target: &SubjectRef) -> Result<Subject, Error> {
        match target {
            SubjectRef::Id { subject_id, display_name } => {
                let name = match display_name {
                    Some(n) => Some(n.clone()),
                    None => self.stored_name(*subject_id).await,
                };
                Ok(self.ctx.registry.get_or_create(*subject_id, name.as_deref()))
            }
            SubjectRef::Name(name) => {
                let subject_id = match self.ctx.identity.resolve(name).await {
                    Ok(id) => id,
                    Err(Error::IdentityNotFound(n)) => return Err(Error::IdentityNotFound(n)),
                    Err(e) => {
                        warn!("Identity lookup for '{}' failed: {}", name, e);
                        return Err(Error::IdentityNotFound(name.clone()));
                    }
                };
                Ok(self.ctx.registry.get_or_create(subject_id, Some(name)))
            }
        }
    }

    async fn stored_name(&self, subject_id: Uuid) -> Option<String> {
        if let Some(live) = self.ctx.registry.get(subject_id) {
            return Some(live.display_name);
        }
        match self.ctx.subject_repo.get_subject(subject_id).await {
            Ok(rec) => rec.map(|r| r.display_name),
            Err(e) => {
                warn!("Could not load subject {}: {}", subject_id, e);
                None
            }
        }
    }

    async fn notify_initiator(&self, initiator: &Actor, key: &str, ph: Placeholders) {
        if let Some(id) = initiator.subject_id() {
            if self.ctx.registry.is_reachable(id) {
                self.notify(Recipient::Subject(id), key, ph).await;
            }
        }
    }

    async fn notify(&self, recipient: Recipient, key: &str, ph: Placeholders) {
        if let Err(e) = self.ctx.messages.notify(recipient, key, &ph).await {
            warn!("Message '{}' to {:?} failed: {}", key, recipient, e);
        }
    }
}

fn trigger_placeholders(player: &str, votes: i64, service: &str) -> Placeholders {
    let votes = votes.to_string();
    placeholders(&[("player", player), ("votes", &votes), ("service", service)])
}
