pub mod pending_replay;
pub mod reward_expiry;

pub use pending_replay::spawn_pending_reward_replay;
pub use reward_expiry::{spawn_reward_expiry_task, DEFAULT_INITIAL_DELAY, DEFAULT_PERIOD};
