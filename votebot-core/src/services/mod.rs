// File: src/services/mod.rs

pub mod engine_context;
pub mod identity;
pub mod reward_config;
pub mod reward_dispatcher;
pub mod reward_selector;
pub mod subject_registry;
pub mod trigger_evaluator;
pub mod vote_service;

pub use engine_context::EngineContext;
pub use identity::{select_identity_resolver, RepositoryIdentityResolver};
pub use reward_config::{RewardConfig, RewardConfigStore};
pub use reward_dispatcher::{DispatchOutcome, RewardDispatcher};
pub use reward_selector::RewardSelector;
pub use subject_registry::SubjectRegistry;
pub use vote_service::{ReplaySummary, VoteOutcome, VoteService};
