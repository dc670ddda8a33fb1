use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use crate::Error;
use votebot_common::traits::repository_traits::SubjectRepository;
use votebot_common::traits::sink_traits::IdentityResolver;

/// Resolves names the service has already seen.
pub struct RepositoryIdentityResolver {
    subject_repo: Arc<dyn SubjectRepository + Send + Sync>,
}

impl RepositoryIdentityResolver {
    pub fn new(subject_repo: Arc<dyn SubjectRepository + Send + Sync>) -> Self {
        Self { subject_repo }
    }
}

#[async_trait]
impl IdentityResolver for RepositoryIdentityResolver {
    async fn resolve(&self, display_name: &str) -> Result<Uuid, Error> {
        self.subject_repo
            .find_subject_id_by_name(display_name)
            .await?
            .ok_or_else(|| Error::IdentityNotFound(display_name.to_string()))
    }
}

/// Picks the single resolver a deployment trusts for name lookups.
///
/// With a network resolver the stored names are never consulted: names get
/// released and reused, so a local row can point at a previous holder.
/// Without one, only names already seen locally resolve.
pub fn select_identity_resolver(
    network: Option<Arc<dyn IdentityResolver + Send + Sync>>,
    subject_repo: Arc<dyn SubjectRepository + Send + Sync>,
) -> Arc<dyn IdentityResolver + Send + Sync> {
    match network {
        Some(authoritative) => authoritative,
        None => {
            warn!("Resolving names from local records only");
            Arc::new(RepositoryIdentityResolver::new(subject_repo))
        }
    }
}
