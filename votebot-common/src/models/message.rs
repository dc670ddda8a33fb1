use std::collections::BTreeMap;
use uuid::Uuid;

/// Where a notification goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    Subject(Uuid),
    Broadcast,
}

/// Placeholder values for a message template (`player`, `votes`, `service`, `reward`).
pub type Placeholders = BTreeMap<String, String>;

/// Builds a placeholder map from literal pairs.
pub fn placeholders(pairs: &[(&str, &str)]) -> Placeholders {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
