use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A participant as the engine sees it during one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub subject_id: Uuid,
    pub display_name: String,
    /// Currently addressable for item grants and direct messages.
    pub reachable: bool,
}

impl Subject {
    pub fn online(subject_id: Uuid, display_name: &str) -> Self {
        Self {
            subject_id,
            display_name: display_name.to_string(),
            reachable: true,
        }
    }

    pub fn offline(subject_id: Uuid, display_name: &str) -> Self {
        Self {
            subject_id,
            display_name: display_name.to_string(),
            reachable: false,
        }
    }
}

/// Row in `vote_subjects`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubjectRecord {
    pub subject_id: Uuid,
    pub display_name: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// How an inbound event names its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectRef {
    /// Already resolved, e.g. from a login event.
    Id {
        subject_id: Uuid,
        display_name: Option<String>,
    },
    /// Only a display name is known; needs identity resolution.
    Name(String),
}

impl SubjectRef {
    pub fn name(name: &str) -> Self {
        SubjectRef::Name(name.to_string())
    }

    pub fn id(subject_id: Uuid, display_name: &str) -> Self {
        SubjectRef::Id {
            subject_id,
            display_name: Some(display_name.to_string()),
        }
    }

    /// Best-effort label for messages and logs before resolution.
    pub fn label(&self) -> String {
        match self {
            SubjectRef::Id { subject_id, display_name } => display_name
                .clone()
                .unwrap_or_else(|| subject_id.to_string()),
            SubjectRef::Name(n) => n.clone(),
        }
    }
}
