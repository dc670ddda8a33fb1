use dashmap::{DashMap, DashSet};
use uuid::Uuid;

use crate::models::Subject;

/// Live subjects keyed by stable identifier.
///
/// Entries are cloned out on every read; no map guard ever outlives a call,
/// so callers are free to `.await` while holding a `Subject`.
#[derive(Default)]
pub struct SubjectRegistry {
    subjects: DashMap<Uuid, Subject>,
    replaying: DashSet<Uuid>,
}

/// Held while a subject's queued rewards are being replayed.
pub struct ReplayGuard<'a> {
    registry: &'a SubjectRegistry,
    subject_id: Uuid,
}

impl Drop for ReplayGuard<'_> {
    fn drop(&mut self) {
        self.registry.replaying.remove(&self.subject_id);
    }
}

impl SubjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called on login. Replaces any offline placeholder for the same id.
    pub fn mark_reachable(&self, subject_id: Uuid, display_name: &str) -> Subject {
        let subject = Subject::online(subject_id, display_name);
        self.subjects.insert(subject_id, subject.clone());
        subject
    }

    /// Returns the live entry, creating an unreachable one if the id is new.
    /// An offline entry takes the supplied name; a live one keeps its own.
    pub fn get_or_create(&self, subject_id: Uuid, display_name: Option<&str>) -> Subject {
        self.subjects
            .entry(subject_id)
            .and_modify(|s| {
                if !s.reachable {
                    if let Some(name) = display_name {
                        s.display_name = name.to_string();
                    }
                }
            })
            .or_insert_with(|| {
                let fallback = subject_id.to_string();
                Subject::offline(subject_id, display_name.unwrap_or(&fallback))
            })
            .value()
            .clone()
    }

    pub fn get(&self, subject_id: Uuid) -> Option<Subject> {
        self.subjects.get(&subject_id).map(|e| e.value().clone())
    }

    pub fn is_reachable(&self, subject_id: Uuid) -> bool {
        self.subjects
            .get(&subject_id)
            .map(|e| e.reachable)
            .unwrap_or(false)
    }

    /// Called on logout.
    pub fn remove(&self, subject_id: Uuid) -> Option<Subject> {
        self.subjects.remove(&subject_id).map(|(_, s)| s)
    }

    /// Drops an entry that was only materialised for one dispatch.
    pub fn release_if_unreachable(&self, subject_id: Uuid) {
        self.subjects.remove_if(&subject_id, |_, s| !s.reachable);
    }

    /// Point-in-time copy of every registered id.
    pub fn snapshot_ids(&self) -> Vec<Uuid> {
        self.subjects.iter().map(|e| *e.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// `None` if a replay for this subject is already running.
    pub fn try_begin_replay(&self, subject_id: Uuid) -> Option<ReplayGuard<'_>> {
        if self.replaying.insert(subject_id) {
            Some(ReplayGuard { registry: self, subject_id })
        } else {
            None
        }
    }
}
