//! Remote store contract and the local-only adapter.

use std::sync::Arc;

use async_trait::async_trait;
use subfox_domain::{OwnerId, Subscription, SubscriptionDraft, SubscriptionId, SubscriptionPatch};

use crate::{session::SessionContext, storage::CacheStore, RemoteError};

/// Hosted backend holding the authenticated user's records.
///
/// Implementations are scoped to one user for their whole lifetime; row
/// ownership is enforced server-side. Adapters return results and never
/// touch the engine's collection.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Subscription>, RemoteError>;

    async fn insert_one(&self, draft: &SubscriptionDraft) -> Result<Subscription, RemoteError>;

    async fn insert_many(
        &self,
        drafts: &[SubscriptionDraft],
    ) -> Result<Vec<Subscription>, RemoteError>;

    /// Succeeds without effect when `id` is unknown server-side.
    async fn update_one(
        &self,
        id: &SubscriptionId,
        patch: &SubscriptionPatch,
    ) -> Result<(), RemoteError>;

    async fn delete_one(&self, id: &SubscriptionId) -> Result<(), RemoteError>;

    /// Short label used in logs.
    fn kind(&self) -> &'static str;
}

/// Builds the remote adapter for a non-sandbox session.
pub trait RemoteFactory: Send + Sync {
    fn connect(&self, context: &SessionContext) -> Arc<dyn RemoteStore>;
}

impl<F> RemoteFactory for F
where
    F: Fn(&SessionContext) -> Arc<dyn RemoteStore> + Send + Sync,
{
    fn connect(&self, context: &SessionContext) -> Arc<dyn RemoteStore> {
        self(context)
    }
}

/// Adapter for the sandbox identity: no backend, the local cache is the
/// only copy. Listing reads the cache back, inserts mint fresh ids, and
/// updates/deletes are accepted as no-ops.
pub struct NullAdapter {
    cache: Arc<dyn CacheStore>,
    owner: OwnerId,
}

impl NullAdapter {
    pub fn new(cache: Arc<dyn CacheStore>, owner: OwnerId) -> Self {
        Self { cache, owner }
    }

    fn materialize(&self, draft: &SubscriptionDraft) -> Subscription {
        Subscription::from_draft(
            SubscriptionId::generate(),
            self.owner.clone(),
            draft.clone(),
        )
    }
}

#[async_trait]
impl RemoteStore for NullAdapter {
    async fn list_all(&self) -> Result<Vec<Subscription>, RemoteError> {
        Ok(self.cache.load())
    }

    async fn insert_one(&self, draft: &SubscriptionDraft) -> Result<Subscription, RemoteError> {
        Ok(self.materialize(draft))
    }

    async fn insert_many(
        &self,
        drafts: &[SubscriptionDraft],
    ) -> Result<Vec<Subscription>, RemoteError> {
        Ok(drafts.iter().map(|draft| self.materialize(draft)).collect())
    }

    async fn update_one(
        &self,
        _id: &SubscriptionId,
        _patch: &SubscriptionPatch,
    ) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn delete_one(&self, _id: &SubscriptionId) -> Result<(), RemoteError> {
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "null"
    }
}
