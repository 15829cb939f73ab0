//! Optimistic synchronization between the local cache and the remote store.
//!
//! Every mutation is committed to the in-memory collection and the cache
//! before the remote call starts. Remote failures never roll a local change
//! back; they come back to the caller as a [`SyncAdvisory`]. Operations are
//! not serialized against each other, so when two remote calls race the
//! response that resolves last decides the final state.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use subfox_domain::{Subscription, SubscriptionDraft, SubscriptionId, SubscriptionPatch};
use tracing::{debug, warn};

use crate::{
    reconcile::{substitute, ReconciliationMap},
    remote::RemoteStore,
    session::SessionContext,
    storage::CacheStore,
    summary_service::{SpendSummary, SummaryService},
    CoreError, RemoteError,
};

/// Lifecycle of the collection as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionState {
    /// Nothing has been read yet.
    Loading,
    /// The cache has been read; later remote refreshes update in place.
    Ready,
}

/// Non-fatal signal attached to an otherwise successful operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAdvisory {
    /// The remote listing failed; the collection reflects the local cache.
    StaleData { reason: String },
    /// The local change is committed but the remote store did not accept it.
    NotSynced {
        ids: Vec<SubscriptionId>,
        reason: String,
    },
}

impl SyncAdvisory {
    fn not_synced(id: &SubscriptionId, err: &RemoteError) -> Self {
        SyncAdvisory::NotSynced {
            ids: vec![id.clone()],
            reason: err.to_string(),
        }
    }
}

/// Result of an engine operation plus an optional advisory.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub struct Synced<T> {
    pub value: T,
    pub advisory: Option<SyncAdvisory>,
}

impl<T> Synced<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            advisory: None,
        }
    }

    pub fn advised(value: T, advisory: SyncAdvisory) -> Self {
        Self {
            value,
            advisory: Some(advisory),
        }
    }

    /// `true` when the remote store confirmed the operation.
    pub fn is_synced(&self) -> bool {
        self.advisory.is_none()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Synced<U> {
        Synced {
            value: f(self.value),
            advisory: self.advisory,
        }
    }
}

struct EngineState {
    phase: CollectionState,
    records: Vec<Subscription>,
    reconciliation: ReconciliationMap,
    /// Temporary ids of adds still waiting for `insert_one`.
    pending: HashSet<SubscriptionId>,
}

struct EngineInner {
    context: SessionContext,
    cache: Arc<dyn CacheStore>,
    remote: Arc<dyn RemoteStore>,
    state: Mutex<EngineState>,
}

/// Single consistent view over the cache and the remote store for one
/// session. Clones share the same collection.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

impl SyncEngine {
    pub fn new(
        context: SessionContext,
        cache: Arc<dyn CacheStore>,
        remote: Arc<dyn RemoteStore>,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                context,
                cache,
                remote,
                state: Mutex::new(EngineState {
                    phase: CollectionState::Loading,
                    records: Vec::new(),
                    reconciliation: ReconciliationMap::new(),
                    pending: HashSet::new(),
                }),
            }),
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.inner.context
    }

    pub fn state(&self) -> CollectionState {
        self.lock().phase
    }

    /// Snapshot of the collection in display order.
    pub fn list(&self) -> Vec<Subscription> {
        self.lock().records.clone()
    }

    /// Looks a record up, following a temporary id to its confirmed id.
    pub fn get(&self, id: &SubscriptionId) -> Option<Subscription> {
        let state = self.lock();
        let id = state.reconciliation.resolve(id);
        state.records.iter().find(|record| &record.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    pub fn summary(&self) -> SpendSummary {
        SummaryService::summarize(&self.lock().records)
    }

    /// Reads the cache into the collection and marks it ready. Returns the
    /// number of records published.
    pub fn load_cache(&self) -> usize {
        let mut state = self.lock();
        self.read_cache(&mut state);
        state.records.len()
    }

    /// Publishes the cache (on first use) and then adopts the remote listing
    /// when it is reachable.
    pub async fn refresh(&self) -> Result<Synced<usize>, CoreError> {
        let cached = {
            let mut state = self.lock();
            if state.phase == CollectionState::Loading {
                self.read_cache(&mut state);
            }
            state.records.len()
        };

        match self.inner.remote.list_all().await {
            Ok(records) => {
                let count = self.adopt_remote(records)?;
                debug!(count, "collection refreshed from remote");
                Ok(Synced::clean(count))
            }
            Err(err) => {
                warn!(error = %err, "remote listing failed; serving cached data");
                Ok(Synced::advised(
                    cached,
                    SyncAdvisory::StaleData {
                        reason: err.to_string(),
                    },
                ))
            }
        }
    }

    /// Adds a record under a temporary id, then swaps in the confirmed record.
    pub async fn add(&self, draft: SubscriptionDraft) -> Result<Synced<Subscription>, CoreError> {
        draft.validate()?;
        let temporary = SubscriptionId::generate();
        let optimistic = Subscription::from_draft(
            temporary.clone(),
            self.context().owner().clone(),
            draft.clone(),
        );
        self.commit(|records| records.push(optimistic.clone()))?;
        self.lock().pending.insert(temporary.clone());
        debug!(id = %temporary, "subscription added locally");

        match self.inner.remote.insert_one(&draft).await {
            Ok(confirmed) => {
                let confirmed = self.confirm(&temporary, confirmed)?;
                Ok(Synced::clean(confirmed))
            }
            Err(err) => {
                self.lock().pending.remove(&temporary);
                warn!(id = %temporary, error = %err, "remote insert failed; keeping local copy");
                Ok(Synced::advised(
                    optimistic,
                    SyncAdvisory::not_synced(&temporary, &err),
                ))
            }
        }
    }

    /// Applies a partial update locally, then forwards it to the remote store.
    pub async fn update(
        &self,
        id: &SubscriptionId,
        patch: SubscriptionPatch,
    ) -> Result<Synced<Subscription>, CoreError> {
        patch.validate()?;
        let (id, updated) = {
            let mut state = self.lock();
            self.ensure_ready(&mut state);
            let id = state.reconciliation.resolve(id).clone();
            let position = state
                .records
                .iter()
                .position(|record| record.id == id)
                .ok_or_else(|| CoreError::NotFound(id.clone()))?;
            let mut next = state.records.clone();
            next[position].apply(&patch);
            let updated = next[position].clone();
            self.persist(&mut state, next)?;
            (id, updated)
        };
        if patch.is_empty() {
            return Ok(Synced::clean(updated));
        }

        match self.inner.remote.update_one(&id, &patch).await {
            Ok(()) => Ok(Synced::clean(updated)),
            Err(err) => {
                warn!(id = %id, error = %err, "remote update failed; keeping local change");
                Ok(Synced::advised(updated, SyncAdvisory::not_synced(&id, &err)))
            }
        }
    }

    /// Removes a record locally, then from the remote store. Unknown ids are
    /// a no-op.
    pub async fn remove(
        &self,
        id: &SubscriptionId,
    ) -> Result<Synced<Option<Subscription>>, CoreError> {
        let (id, removed) = {
            let mut state = self.lock();
            self.ensure_ready(&mut state);
            let id = state.reconciliation.resolve(id).clone();
            let Some(position) = state.records.iter().position(|record| record.id == id) else {
                debug!(id = %id, "remove ignored for unknown id");
                return Ok(Synced::clean(None));
            };
            let mut next = state.records.clone();
            let removed = next.remove(position);
            self.persist(&mut state, next)?;
            state.pending.remove(&id);
            (id, removed)
        };

        match self.inner.remote.delete_one(&id).await {
            Ok(()) => Ok(Synced::clean(Some(removed))),
            Err(err) => {
                warn!(id = %id, error = %err, "remote delete failed; record stays removed locally");
                Ok(Synced::advised(
                    Some(removed),
                    SyncAdvisory::not_synced(&id, &err),
                ))
            }
        }
    }

    /// Bulk add. Local copies are written in one batch; after a successful
    /// multi-row insert the whole collection is re-read from the remote
    /// store, since returned rows cannot be matched to temporary ids.
    pub async fn import(
        &self,
        drafts: Vec<SubscriptionDraft>,
    ) -> Result<Synced<usize>, CoreError> {
        for (index, draft) in drafts.iter().enumerate() {
            draft.validate().map_err(|err| err.at_import_entry(index))?;
        }
        if drafts.is_empty() {
            return Ok(Synced::clean(0));
        }

        let owner = self.context().owner().clone();
        let imported: Vec<Subscription> = drafts
            .iter()
            .map(|draft| {
                Subscription::from_draft(SubscriptionId::generate(), owner.clone(), draft.clone())
            })
            .collect();
        let ids: Vec<SubscriptionId> = imported.iter().map(|record| record.id.clone()).collect();
        self.commit(|records| records.extend(imported))?;
        debug!(count = ids.len(), "subscriptions imported locally");

        match self.inner.remote.insert_many(&drafts).await {
            Ok(_) => {
                let refreshed = self.refresh().await?;
                Ok(refreshed.map(|_| ids.len()))
            }
            Err(err) => {
                warn!(count = ids.len(), error = %err, "remote bulk insert failed; keeping local copies");
                Ok(Synced::advised(
                    ids.len(),
                    SyncAdvisory::NotSynced {
                        ids,
                        reason: err.to_string(),
                    },
                ))
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_ready(&self, state: &mut EngineState) {
        if state.phase == CollectionState::Loading {
            self.read_cache(state);
        }
    }

    fn read_cache(&self, state: &mut EngineState) {
        let loaded = self.inner.cache.load();
        state.records = self.claim(loaded);
        state.phase = CollectionState::Ready;
        debug!(count = state.records.len(), "collection published from cache");
    }

    /// Runs `mutate` on a copy of the collection and publishes it once the
    /// cache accepted the write.
    fn commit(&self, mutate: impl FnOnce(&mut Vec<Subscription>)) -> Result<(), CoreError> {
        let mut state = self.lock();
        self.ensure_ready(&mut state);
        let mut next = state.records.clone();
        mutate(&mut next);
        self.persist(&mut state, next)
    }

    /// Writes the session user's records to the cache, leaving records of
    /// other users in place, then publishes `next`.
    fn persist(&self, state: &mut EngineState, next: Vec<Subscription>) -> Result<(), CoreError> {
        let owner = self.context().owner();
        let mut stored: Vec<Subscription> = self
            .inner
            .cache
            .load()
            .into_iter()
            .filter(|record| !record.owner.is_unset() && &record.owner != owner)
            .collect();
        stored.extend(next.iter().cloned());
        self.inner.cache.save(&stored)?;
        state.records = next;
        Ok(())
    }

    fn confirm(
        &self,
        temporary: &SubscriptionId,
        mut confirmed: Subscription,
    ) -> Result<Subscription, CoreError> {
        if confirmed.owner.is_unset() {
            confirmed.owner = self.context().owner().clone();
        }
        let mut state = self.lock();
        state
            .reconciliation
            .record(temporary.clone(), confirmed.id.clone());
        let awaited = state.pending.remove(temporary);
        let mut next = state.records.clone();
        if !substitute(&mut next, temporary, confirmed.clone()) {
            // A refresh replaced the collection while the insert was in
            // flight; a local remove clears `pending` instead.
            if !awaited || next.iter().any(|record| record.id == confirmed.id) {
                debug!(id = %temporary, "confirmation arrived for a record no longer present");
                return Ok(confirmed);
            }
            next.push(confirmed.clone());
        }
        self.persist(&mut state, next)?;
        debug!(temporary = %temporary, confirmed = %confirmed.id, "subscription confirmed");
        Ok(confirmed)
    }

    fn adopt_remote(&self, records: Vec<Subscription>) -> Result<usize, CoreError> {
        let next = self.claim(records);
        let count = next.len();
        let mut state = self.lock();
        self.persist(&mut state, next)?;
        state.phase = CollectionState::Ready;
        Ok(count)
    }

    /// Keeps records that belong to the session user, adopting unowned ones,
    /// and drops repeated ids.
    fn claim(&self, records: Vec<Subscription>) -> Vec<Subscription> {
        let owner = self.context().owner();
        let mut seen = HashSet::new();
        let mut claimed = Vec::with_capacity(records.len());
        for mut record in records {
            if record.owner.is_unset() {
                record.owner = owner.clone();
            } else if &record.owner != owner {
                debug!(id = %record.id, "skipping record owned by another user");
                continue;
            }
            if !seen.insert(record.id.clone()) {
                warn!(id = %record.id, "dropping duplicate subscription id");
                continue;
            }
            claimed.push(record);
        }
        claimed
    }
}
