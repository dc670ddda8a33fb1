use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::Error;
use crate::models::{RewardDefinition, RewardItem, SelectedItem};
use votebot_common::traits::sink_traits::ItemCatalog;

/// Turns a reward definition into the concrete items to hand out.
pub struct RewardSelector {
    catalog: Arc<dyn ItemCatalog + Send + Sync>,
    rng: Mutex<StdRng>,
}

impl RewardSelector {
    pub fn new(catalog: Arc<dyn ItemCatalog + Send + Sync>) -> Self {
        Self {
            catalog,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic selection, for tests and reproducible runs.
    pub fn with_seed(catalog: Arc<dyn ItemCatalog + Send + Sync>, seed: u64) -> Self {
        Self {
            catalog,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Expands every item in definition order, dropping ones the catalog
    /// cannot resolve, then trims randomized rewards down to `max_items`.
    pub async fn select(&self, reward: &RewardDefinition) -> Vec<SelectedItem> {
        let mut expanded = Vec::with_capacity(reward.items.len());
        for item in &reward.items {
            match self.expand(item).await {
                Ok(selected) => expanded.push(selected),
                Err(e) => {
                    warn!("Reward '{}': skipping item {}: {}", reward.name, item.kind, e);
                }
            }
        }

        let selected = {
            let mut rng = self.rng.lock();
            trim_to_max(expanded, reward.randomized, reward.max_items, &mut *rng)
        };
        debug!("Reward '{}' selected {} item(s)", reward.name, selected.len());
        selected
    }

    async fn expand(&self, item: &RewardItem) -> Result<SelectedItem, Error> {
        let mut concrete = self
            .catalog
            .resolve_item(&item.kind)
            .await?
            .ok_or_else(|| Error::CatalogItemUnavailable(item.kind.to_string()))?;

        concrete.quantity = item.quantity;
        if let Some(title) = &item.title {
            concrete.title = Some(title.clone());
        }
        if !item.lore.is_empty() {
            concrete.lore = item.lore.clone();
        }

        Ok(SelectedItem {
            item: concrete,
            commands: item.commands.clone(),
        })
    }
}

/// Removes uniformly random elements until at most `max_items` remain.
/// Survivors keep their original relative order. Non-randomized lists and
/// `max_items == 0` pass through untouched; short lists are never padded.
pub fn trim_to_max<T, R: Rng + ?Sized>(
    mut items: Vec<T>,
    randomized: bool,
    max_items: usize,
    rng: &mut R,
) -> Vec<T> {
    if !randomized || max_items == 0 || max_items >= items.len() {
        return items;
    }
    while items.len() > max_items {
        let idx = rng.random_range(0..items.len());
        items.remove(idx);
    }
    items
}
