use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::subject::SubjectRef;

/// Service name used for operator-issued votes and rewards.
pub const ADMIN_SERVICE: &str = "Admin";

/// Who caused a vote or a manual grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// A subject voting for itself or for someone else.
    Subject(Uuid),
    /// Operator override. Suppresses broadcasts.
    Admin { subject_id: Option<Uuid> },
    /// An external vote listener with no subject behind it.
    Service,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        matches!(self, Actor::Admin { .. })
    }

    pub fn subject_id(&self) -> Option<Uuid> {
        match self {
            Actor::Subject(id) => Some(*id),
            Actor::Admin { subject_id } => *subject_id,
            Actor::Service => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VoteEvent {
    pub source: Actor,
    pub target: SubjectRef,
    pub service: String,
    pub timestamp: DateTime<Utc>,
}

impl VoteEvent {
    pub fn new(source: Actor, target: SubjectRef, service: &str) -> Self {
        Self {
            source,
            target,
            service: service.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// A vote delivered by a listing site for the named subject.
    pub fn from_service(target_name: &str, service: &str) -> Self {
        Self::new(Actor::Service, SubjectRef::name(target_name), service)
    }
}

/// Counters read back after a vote has been recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoteCounts {
    pub subject: i64,
    pub global: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteStats {
    pub subject_id: Uuid,
    pub total_votes: i64,
    pub last_vote: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRank {
    pub subject_id: Uuid,
    pub display_name: String,
    pub votes: i64,
}
