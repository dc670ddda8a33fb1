use serde::{Deserialize, Serialize};

/// Which counter a rule is tested against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerScope {
    #[serde(alias = "player")]
    Subject,
    #[serde(alias = "server")]
    Global,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRule {
    pub name: String,
    pub scope: TriggerScope,
    /// 0 (or anything non-positive) fires on every vote.
    #[serde(default)]
    pub threshold: i64,
    #[serde(default = "default_repeat")]
    pub repeat: bool,
    /// Reward definition names, granted in this order.
    #[serde(default)]
    pub rewards: Vec<String>,
    /// Message key sent to the rewarded subject.
    #[serde(default)]
    pub subject_message: Option<String>,
    /// Message key broadcast to everyone.
    #[serde(default)]
    pub broadcast_message: Option<String>,
}

fn default_repeat() -> bool {
    true
}

impl TriggerRule {
    pub fn new(name: &str, scope: TriggerScope, threshold: i64, repeat: bool) -> Self {
        Self {
            name: name.to_string(),
            scope,
            threshold,
            repeat,
            rewards: Vec::new(),
            subject_message: None,
            broadcast_message: None,
        }
    }

    pub fn with_rewards(mut self, rewards: &[&str]) -> Self {
        self.rewards = rewards.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_messages(mut self, subject_message: &str, broadcast_message: &str) -> Self {
        self.subject_message = Some(subject_message.to_string());
        self.broadcast_message = Some(broadcast_message.to_string());
        self
    }
}
