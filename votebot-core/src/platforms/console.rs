use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::Error;
use crate::models::{ConcreteItem, ItemKind, Placeholders, Recipient};
use crate::services::reward_config::RewardConfigStore;
use votebot_common::traits::sink_traits::{ItemCatalog, ItemSink, MessageSink, PrivilegedExecutor};

/// Stand-in host used when no game server is attached: messages, grants and
/// console commands all end up in the log.
pub struct ConsoleBridge {
    config: Arc<RewardConfigStore>,
}

impl ConsoleBridge {
    pub fn new(config: Arc<RewardConfigStore>) -> Self {
        Self { config }
    }

    pub fn render(&self, template_key: &str, placeholders: &Placeholders) -> String {
        self.config.snapshot().render_message(template_key, placeholders)
    }
}

#[async_trait]
impl MessageSink for ConsoleBridge {
    async fn notify(
        &self,
        recipient: Recipient,
        template_key: &str,
        placeholders: &Placeholders,
    ) -> Result<(), Error> {
        let text = self.render(template_key, placeholders);
        match recipient {
            Recipient::Broadcast => info!("[broadcast] {text}"),
            Recipient::Subject(id) => info!("[to {id}] {text}"),
        }
        Ok(())
    }
}

#[async_trait]
impl ItemSink for ConsoleBridge {
    async fn grant_item(&self, subject_id: Uuid, item: &ConcreteItem) -> Result<(), Error> {
        info!(
            "[grant {subject_id}] {} x{}{}",
            item.material,
            item.quantity,
            item.title.as_deref().map(|t| format!(" \"{t}\"")).unwrap_or_default()
        );
        Ok(())
    }
}

#[async_trait]
impl PrivilegedExecutor for ConsoleBridge {
    async fn run_privileged_command(&self, command: &str) -> Result<(), Error> {
        info!("[console] /{}", command.trim_start_matches('/'));
        Ok(())
    }
}

/// Resolves plain materials directly and heads from a fixed table.
#[derive(Default)]
pub struct StandardCatalog {
    heads: HashMap<String, String>,
}

impl StandardCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// `heads` maps head id to its display title.
    pub fn with_heads(heads: HashMap<String, String>) -> Self {
        Self { heads }
    }
}

#[async_trait]
impl ItemCatalog for StandardCatalog {
    async fn resolve_item(&self, kind: &ItemKind) -> Result<Option<ConcreteItem>, Error> {
        let item = match kind {
            ItemKind::Standard(material) => {
                let material = material.trim().to_lowercase();
                if material.is_empty() {
                    return Ok(None);
                }
                Some(ConcreteItem {
                    source: kind.clone(),
                    material,
                    quantity: 1,
                    title: None,
                    lore: Vec::new(),
                })
            }
            ItemKind::CatalogHead(id) => self.heads.get(id).map(|title| ConcreteItem {
                source: kind.clone(),
                material: "player_head".to_string(),
                quantity: 1,
                title: Some(title.clone()),
                lore: Vec::new(),
            }),
        };
        Ok(item)
    }
}
