// src/repositories/mod.rs

pub use votebot_common::traits::repository_traits::{
    PendingRewardRepository, SubjectRepository, VoteRepository,
};

pub use postgres::votes::PostgresVoteRepository;
pub use postgres::pending_rewards::PostgresPendingRewardRepository;
pub use postgres::subjects::PostgresSubjectRepository;

pub mod postgres;
