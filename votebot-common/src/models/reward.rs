use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What an item is made of. Catalog heads need an external lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ItemKind {
    Standard(String),
    CatalogHead(String),
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemKind::Standard(m) => write!(f, "{}", m),
            ItemKind::CatalogHead(id) => write!(f, "head:{}", id),
        }
    }
}

/// One configured entry of a reward bundle. The item and its commands
/// travel together through selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardItem {
    pub kind: ItemKind,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub lore: Vec<String>,
    /// Console command templates; `{player}` is replaced at delivery.
    #[serde(default)]
    pub commands: Vec<String>,
}

fn default_quantity() -> u32 {
    1
}

impl RewardItem {
    pub fn standard(material: &str, quantity: u32) -> Self {
        Self {
            kind: ItemKind::Standard(material.to_string()),
            quantity,
            title: None,
            lore: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn head(head_id: &str) -> Self {
        Self {
            kind: ItemKind::CatalogHead(head_id.to_string()),
            quantity: 1,
            title: None,
            lore: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn with_commands(mut self, commands: &[&str]) -> Self {
        self.commands = commands.iter().map(|c| c.to_string()).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardDefinition {
    /// Unique key referenced by triggers and pending rows.
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub items: Vec<RewardItem>,
    #[serde(default)]
    pub randomized: bool,
    /// 0 means no limit.
    #[serde(default)]
    pub max_items: usize,
}

impl RewardDefinition {
    pub fn new(name: &str, display_name: &str, items: Vec<RewardItem>) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            items,
            randomized: false,
            max_items: 0,
        }
    }

    pub fn randomized(mut self, max_items: usize) -> Self {
        self.randomized = true;
        self.max_items = max_items;
        self
    }
}

/// An item after catalog resolution, ready to be granted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcreteItem {
    pub source: ItemKind,
    pub material: String,
    pub quantity: u32,
    pub title: Option<String>,
    pub lore: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectedItem {
    pub item: ConcreteItem,
    pub commands: Vec<String>,
}

impl SelectedItem {
    /// Commands with `{player}` substituted.
    pub fn resolved_commands(&self, player: &str) -> Vec<String> {
        self.commands
            .iter()
            .map(|c| c.replace("{player}", player))
            .collect()
    }
}

/// Row in `pending_rewards`: a reward queued for an unreachable subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PendingReward {
    pub pending_id: Uuid,
    pub subject_id: Uuid,
    pub reward_name: String,
    pub vote_service: String,
    pub enqueued_at: DateTime<Utc>,
}

impl PendingReward {
    pub fn new(subject_id: Uuid, reward_name: &str, vote_service: &str) -> Self {
        Self {
            pending_id: Uuid::new_v4(),
            subject_id,
            reward_name: reward_name.to_string(),
            vote_service: vote_service.to_string(),
            enqueued_at: Utc::now(),
        }
    }
}
