// File: votebot-common/src/models/mod.rs
pub mod subject;
pub mod vote;
pub mod trigger;
pub mod reward;
pub mod message;

pub use subject::{Subject, SubjectRecord, SubjectRef};
pub use vote::{Actor, VoteCounts, VoteEvent, VoteStats, VoterRank, ADMIN_SERVICE};
pub use trigger::{TriggerRule, TriggerScope};
pub use reward::{ConcreteItem, ItemKind, PendingReward, RewardDefinition, RewardItem, SelectedItem};
pub use message::{placeholders, Placeholders, Recipient};
