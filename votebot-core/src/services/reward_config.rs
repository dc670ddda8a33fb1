//! Trigger table and reward definitions, swapped atomically on reload.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::Error;
use crate::models::{Placeholders, RewardDefinition, TriggerRule};

fn default_expire_days() -> u32 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardConfig {
    /// Queued rewards older than this many days are deleted.
    #[serde(default = "default_expire_days")]
    pub rewards_expire_days: u32,
    #[serde(default)]
    pub triggers: Vec<TriggerRule>,
    #[serde(default)]
    pub rewards: Vec<RewardDefinition>,
    /// Message templates keyed by template key.
    #[serde(default)]
    pub messages: HashMap<String, String>,
    #[serde(skip)]
    reward_index: HashMap<String, usize>,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            rewards_expire_days: default_expire_days(),
            triggers: Vec::new(),
            rewards: Vec::new(),
            messages: HashMap::new(),
            reward_index: HashMap::new(),
        }
    }
}

impl RewardConfig {
    pub fn new(triggers: Vec<TriggerRule>, rewards: Vec<RewardDefinition>) -> Result<Self, Error> {
        let mut cfg = Self {
            triggers,
            rewards,
            ..Self::default()
        };
        cfg.build_index()?;
        Ok(cfg)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, Error> {
        let de = &mut serde_json::Deserializer::from_str(raw);
        let mut cfg: RewardConfig = serde_path_to_error::deserialize(de)
            .map_err(|e| Error::Config(format!("invalid reward config at '{}': {}", e.path(), e.inner())))?;
        cfg.build_index()?;
        Ok(cfg)
    }

    pub fn with_messages(mut self, messages: &[(&str, &str)]) -> Self {
        self.messages = messages
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self
    }

    fn build_index(&mut self) -> Result<(), Error> {
        let mut index = HashMap::with_capacity(self.rewards.len());
        for (i, reward) in self.rewards.iter().enumerate() {
            if index.insert(reward.name.clone(), i).is_some() {
                return Err(Error::Config(format!("duplicate reward name '{}'", reward.name)));
            }
        }
        for rule in &self.triggers {
            for name in &rule.rewards {
                if !index.contains_key(name) {
                    warn!("Trigger '{}' references unknown reward '{}'", rule.name, name);
                }
            }
        }
        self.reward_index = index;
        Ok(())
    }

    pub fn reward(&self, name: &str) -> Option<&RewardDefinition> {
        self.reward_index.get(name).map(|&i| &self.rewards[i])
    }

    pub fn trigger_names(&self) -> Vec<&str> {
        self.triggers.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn reward_names(&self) -> Vec<&str> {
        self.rewards.iter().map(|r| r.name.as_str()).collect()
    }

    /// Operator-facing summary of the trigger table and reward definitions,
    /// in definition order.
    pub fn listing(&self) -> serde_json::Value {
        let triggers = self
            .triggers
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "scope": t.scope,
                    "threshold": t.threshold,
                    "repeat": t.repeat,
                    "rewards": t.rewards,
                })
            })
            .collect::<Vec<_>>();
        let rewards = self
            .rewards
            .iter()
            .map(|r| {
                serde_json::json!({
                    "name": r.name,
                    "display_name": r.display_name,
                    "items": r.items.len(),
                    "randomized": r.randomized,
                    "max_items": r.max_items,
                })
            })
            .collect::<Vec<_>>();
        serde_json::json!({
            "triggers": triggers,
            "rewards": rewards,
            "rewards_expire_days": self.rewards_expire_days,
        })
    }

    /// Looks up the template for `key` (the key itself if missing) and
    /// substitutes each `{placeholder}`.
    pub fn render_message(&self, key: &str, placeholders: &Placeholders) -> String {
        let mut text = self.messages.get(key).cloned().unwrap_or_else(|| key.to_string());
        for (k, v) in placeholders {
            text = text.replace(&format!("{{{}}}", k), v);
        }
        text
    }
}

/// Holds the active `RewardConfig`. Readers take an `Arc` snapshot and keep
/// using it for the whole operation, so a reload is never seen half-applied.
pub struct RewardConfigStore {
    current: RwLock<Arc<RewardConfig>>,
    source: Option<PathBuf>,
}

impl RewardConfigStore {
    pub fn new(config: RewardConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(config)),
            source: None,
        }
    }

    pub async fn load_from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let config = read_config(&path).await?;
        info!(
            "Loaded {} trigger(s) and {} reward(s) from {}",
            config.triggers.len(),
            config.rewards.len(),
            path.display()
        );
        Ok(Self {
            current: RwLock::new(Arc::new(config)),
            source: Some(path),
        })
    }

    pub fn snapshot(&self) -> Arc<RewardConfig> {
        self.current.read().clone()
    }

    pub fn replace(&self, config: RewardConfig) {
        *self.current.write() = Arc::new(config);
    }

    /// Re-reads the source file. On error the previous config stays active.
    pub async fn reload(&self) -> Result<(), Error> {
        let path = self
            .source
            .as_ref()
            .ok_or_else(|| Error::Config("reward config was not loaded from a file".into()))?;
        let config = read_config(path).await?;
        info!("Reloaded reward config from {}", path.display());
        self.replace(config);
        Ok(())
    }
}

async fn read_config(path: &Path) -> Result<RewardConfig, Error> {
    let raw = tokio::fs::read_to_string(path).await?;
    RewardConfig::from_json_str(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{placeholders, ItemKind, TriggerScope};

    const SAMPLE: &str = r#"
    {
        "rewards_expire_days": 7,
        "triggers": [
            { "name": "every_vote", "scope": "player", "rewards": ["small"] },
            { "name": "fifth", "scope": "subject", "threshold": 5, "repeat": true,
              "rewards": ["small", "big"], "subject_message": "fifth_player",
              "broadcast_message": "fifth_broadcast" },
            { "name": "server_100", "scope": "server", "threshold": 100, "repeat": false }
        ],
        "rewards": [
            { "name": "small", "display_name": "Small Bundle",
              "items": [ { "kind": { "type": "standard", "id": "diamond" }, "quantity": 2 } ] },
            { "name": "big", "display_name": "Big Bundle", "randomized": true, "max_items": 1,
              "items": [
                { "kind": { "type": "catalog_head", "id": "1234" } },
                { "kind": { "type": "standard", "id": "emerald" }, "commands": ["give {player} xp 10"] }
              ] }
        ],
        "messages": { "fifth_player": "Thanks {player}, that's {votes} votes!" }
    }"#;

    #[test]
    fn parses_sample_config() {
        let cfg = RewardConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(cfg.rewards_expire_days, 7);
        assert_eq!(cfg.trigger_names(), vec!["every_vote", "fifth", "server_100"]);
        assert_eq!(cfg.triggers[0].scope, TriggerScope::Subject);
        assert_eq!(cfg.triggers[0].threshold, 0);
        assert!(cfg.triggers[0].repeat);
        assert_eq!(cfg.triggers[2].scope, TriggerScope::Global);
        assert!(!cfg.triggers[2].repeat);

        let big = cfg.reward("big").unwrap();
        assert!(big.randomized);
        assert_eq!(big.max_items, 1);
        assert_eq!(big.items[0].kind, ItemKind::CatalogHead("1234".into()));
        assert_eq!(big.items[0].quantity, 1);
        assert_eq!(big.items[1].commands, vec!["give {player} xp 10"]);
        assert!(cfg.reward("missing").is_none());
    }

    #[test]
    fn listing_keeps_definition_order() {
        let cfg = RewardConfig::from_json_str(SAMPLE).unwrap();
        let listing = cfg.listing();

        let triggers: Vec<&str> = listing["triggers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(triggers, cfg.trigger_names());
        assert_eq!(listing["triggers"][1]["rewards"], serde_json::json!(["small", "big"]));

        assert_eq!(listing["rewards"][0]["name"], "small");
        assert_eq!(listing["rewards"][1]["items"], 2);
        assert_eq!(listing["rewards"][1]["max_items"], 1);
        assert_eq!(listing["rewards_expire_days"], 7);
    }

    #[test]
    fn rejects_duplicate_reward_names() {
        let raw = r#"{ "rewards": [
            { "name": "a", "display_name": "A" },
            { "name": "a", "display_name": "A again" } ] }"#;
        let err = RewardConfig::from_json_str(raw).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn reports_path_of_bad_field() {
        let raw = r#"{ "triggers": [ { "name": "x", "scope": "everyone" } ] }"#;
        match RewardConfig::from_json_str(raw) {
            Err(Error::Config(msg)) => assert!(msg.contains("triggers[0].scope"), "{}", msg),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn renders_templates_and_falls_back_to_key() {
        let cfg = RewardConfig::from_json_str(SAMPLE).unwrap();
        let ph = placeholders(&[("player", "Steve"), ("votes", "5")]);
        assert_eq!(cfg.render_message("fifth_player", &ph), "Thanks Steve, that's 5 votes!");
        assert_eq!(cfg.render_message("unknown_key", &ph), "unknown_key");
    }

    #[test]
    fn snapshot_survives_replace() {
        let store = RewardConfigStore::new(RewardConfig::from_json_str(SAMPLE).unwrap());
        let before = store.snapshot();
        store.replace(RewardConfig::default());
        assert_eq!(before.triggers.len(), 3);
        assert!(store.snapshot().triggers.is_empty());
    }

    #[tokio::test]
    async fn reload_keeps_old_config_on_bad_file() {
        let path = std::env::temp_dir().join(format!("votebot-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, SAMPLE).await.unwrap();

        let store = RewardConfigStore::load_from_path(&path).await.unwrap();
        assert_eq!(store.snapshot().rewards_expire_days, 7);

        tokio::fs::write(&path, r#"{"rewards_expire_days": "soon"}"#).await.unwrap();
        assert!(matches!(store.reload().await, Err(Error::Config(_))));
        assert_eq!(store.snapshot().triggers.len(), 3);

        tokio::fs::write(&path, r#"{"rewards_expire_days": 1}"#).await.unwrap();
        store.reload().await.unwrap();
        assert_eq!(store.snapshot().rewards_expire_days, 1);
        assert!(store.snapshot().triggers.is_empty());

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn reload_without_source_is_an_error() {
        let store = RewardConfigStore::new(RewardConfig::default());
        assert!(store.reload().await.is_err());
    }
}
