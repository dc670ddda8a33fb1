//! Boundaries between the engine and the host it runs inside.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Error;
use crate::models::{ConcreteItem, ItemKind, Placeholders, Recipient};

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Fails with `Error::IdentityNotFound` when the name maps to nobody.
    async fn resolve(&self, display_name: &str) -> Result<Uuid, Error>;
}

#[async_trait]
pub trait MessageSink: Send + Sync {
    /// `template_key` names a localized template; the sink renders it.
    async fn notify(
        &self,
        recipient: Recipient,
        template_key: &str,
        placeholders: &Placeholders,
    ) -> Result<(), Error>;
}

#[async_trait]
pub trait ItemSink: Send + Sync {
    async fn grant_item(&self, subject_id: Uuid, item: &ConcreteItem) -> Result<(), Error>;
}

/// Runs operator-authored commands with console authority.
#[async_trait]
pub trait PrivilegedExecutor: Send + Sync {
    async fn run_privileged_command(&self, command: &str) -> Result<(), Error>;
}

#[async_trait]
pub trait ItemCatalog: Send + Sync {
    /// `Ok(None)` when the kind is unknown to the catalog.
    async fn resolve_item(&self, kind: &ItemKind) -> Result<Option<ConcreteItem>, Error>;
}
