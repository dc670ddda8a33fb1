// src/repositories/postgres/mod.rs

pub mod votes;
pub mod pending_rewards;
pub mod subjects;

pub use votes::PostgresVoteRepository;
pub use pending_rewards::PostgresPendingRewardRepository;
pub use subjects::PostgresSubjectRepository;
