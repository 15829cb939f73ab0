use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use subfox_domain::{
    CurrencyCode, OwnerId, Recurrence, Subscription, SubscriptionDraft, SubscriptionId,
    SubscriptionPatch,
};
use tokio::sync::{watch, Notify};

use crate::{
    remote::RemoteStore, session::SessionContext, storage::CacheStore,
    summary_service::SummaryService, CollectionState, CoreError, MemoryCacheStore, RemoteError,
    SessionController, SessionEvent, SyncAdvisory, SyncEngine, UserSession, UNCATEGORIZED,
};

/// Scriptable backend: keeps rows in memory, can be switched offline and can
/// hold inserts until released.
#[derive(Default)]
struct FakeRemote {
    owner: OwnerId,
    rows: Mutex<Vec<Subscription>>,
    offline: AtomicBool,
    gate: Option<Arc<Notify>>,
    issued: AtomicUsize,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeRemote {
    fn new(owner: &str) -> Self {
        Self {
            owner: OwnerId::new(owner),
            ..Self::default()
        }
    }

    fn offline(owner: &str) -> Self {
        let remote = Self::new(owner);
        remote.offline.store(true, Ordering::SeqCst);
        remote
    }

    fn gated(owner: &str, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(owner)
        }
    }

    fn with_rows(self, rows: Vec<Subscription>) -> Self {
        *self.rows.lock().unwrap() = rows;
        self
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn enter(&self, call: &'static str) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push(call);
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Transport("connection refused".into()));
        }
        Ok(())
    }

    fn store(&self, draft: &SubscriptionDraft) -> Subscription {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        let row = Subscription::from_draft(
            SubscriptionId::new(format!("srv-{n}")),
            self.owner.clone(),
            draft.clone(),
        );
        self.rows.lock().unwrap().push(row.clone());
        row
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn list_all(&self) -> Result<Vec<Subscription>, RemoteError> {
        self.enter("list")?;
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn insert_one(&self, draft: &SubscriptionDraft) -> Result<Subscription, RemoteError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.enter("insert")?;
        Ok(self.store(draft))
    }

    async fn insert_many(
        &self,
        drafts: &[SubscriptionDraft],
    ) -> Result<Vec<Subscription>, RemoteError> {
        self.enter("insert_many")?;
        Ok(drafts.iter().map(|draft| self.store(draft)).collect())
    }

    async fn update_one(
        &self,
        id: &SubscriptionId,
        patch: &SubscriptionPatch,
    ) -> Result<(), RemoteError> {
        self.enter("update")?;
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|row| &row.id == id) {
            row.apply(patch);
        }
        Ok(())
    }

    async fn delete_one(&self, id: &SubscriptionId) -> Result<(), RemoteError> {
        self.enter("delete")?;
        self.rows.lock().unwrap().retain(|row| &row.id != id);
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "fake"
    }
}

fn eur() -> CurrencyCode {
    CurrencyCode::parse("EUR").unwrap()
}

fn draft(name: &str, amount: f64, recurrence: Recurrence) -> SubscriptionDraft {
    SubscriptionDraft::new(name, amount, eur(), recurrence).expect("valid draft")
}

fn record(id: &str, owner: &str, name: &str, amount: f64) -> Subscription {
    Subscription::from_draft(
        SubscriptionId::from(id),
        OwnerId::new(owner),
        draft(name, amount, Recurrence::Monthly),
    )
}

fn engine_for(
    user: &str,
    cache: Arc<MemoryCacheStore>,
    remote: Arc<FakeRemote>,
) -> SyncEngine {
    let context = SessionContext::new(UserSession::new(user), "test");
    SyncEngine::new(context, cache, remote)
}

#[tokio::test]
async fn refresh_adopts_remote_listing_and_writes_cache() {
    let cache = Arc::new(MemoryCacheStore::new());
    let remote = Arc::new(
        FakeRemote::new("alice").with_rows(vec![record("r1", "alice", "Netflix", 12.99)]),
    );
    let engine = engine_for("alice", cache.clone(), remote);
    assert_eq!(engine.state(), CollectionState::Loading);

    let outcome = engine.refresh().await.expect("refresh");

    assert_eq!(outcome.value, 1);
    assert!(outcome.is_synced());
    assert_eq!(engine.state(), CollectionState::Ready);
    assert_eq!(cache.load(), engine.list());
}

#[tokio::test]
async fn refresh_failure_serves_cache_with_stale_advisory() {
    let cache = Arc::new(MemoryCacheStore::with_records(vec![
        record("c1", "alice", "Spotify", 9.99),
        record("c2", "alice", "Gym", 30.0),
    ]));
    let engine = engine_for("alice", cache, Arc::new(FakeRemote::offline("alice")));

    let outcome = engine.refresh().await.expect("refresh");

    assert_eq!(outcome.value, 2);
    assert!(matches!(
        outcome.advisory,
        Some(SyncAdvisory::StaleData { .. })
    ));
    assert_eq!(engine.len(), 2);
    assert_eq!(engine.state(), CollectionState::Ready);
}

#[tokio::test]
async fn cached_records_of_other_users_are_hidden() {
    let mut legacy = record("c3", "alice", "Legacy", 5.0);
    legacy.owner = OwnerId::default();
    let cache = Arc::new(MemoryCacheStore::with_records(vec![
        record("c1", "alice", "Mine", 1.0),
        record("c2", "bob", "Theirs", 2.0),
        record("c1", "alice", "Duplicate", 3.0),
        legacy,
    ]));
    let engine = engine_for("alice", cache, Arc::new(FakeRemote::offline("alice")));

    assert_eq!(engine.load_cache(), 2);
    let records = engine.list();
    assert_eq!(records[0].name, "Mine");
    assert_eq!(records[1].name, "Legacy");
    assert!(records.iter().all(|r| r.owner.as_str() == "alice"));
}

#[tokio::test]
async fn add_is_visible_before_the_remote_confirms() {
    let gate = Arc::new(Notify::new());
    let cache = Arc::new(MemoryCacheStore::new());
    let remote = Arc::new(FakeRemote::gated("alice", gate.clone()));
    let engine = engine_for("alice", cache.clone(), remote);

    let pending = tokio::spawn({
        let engine = engine.clone();
        async move { engine.add(draft("Netflix", 12.99, Recurrence::Monthly)).await }
    });
    while engine.is_empty() {
        tokio::task::yield_now().await;
    }

    let optimistic = engine.list();
    assert_eq!(optimistic.len(), 1);
    assert_eq!(optimistic[0].name, "Netflix");
    assert_eq!(cache.load().len(), 1);
    let temporary = optimistic[0].id.clone();

    gate.notify_one();
    let confirmed = pending.await.unwrap().expect("add");

    assert!(confirmed.is_synced());
    assert_eq!(confirmed.value.id.as_str(), "srv-0");
    assert_eq!(engine.len(), 1);
    assert_eq!(engine.list()[0].id.as_str(), "srv-0");
    assert_eq!(engine.get(&temporary).map(|r| r.id), Some(confirmed.value.id));
}

#[tokio::test]
async fn confirmation_after_a_refresh_restores_the_added_record() {
    let gate = Arc::new(Notify::new());
    let cache = Arc::new(MemoryCacheStore::new());
    let remote = Arc::new(FakeRemote::gated("alice", gate.clone()));
    let engine = engine_for("alice", cache.clone(), remote.clone());

    let pending = tokio::spawn({
        let engine = engine.clone();
        async move { engine.add(draft("Netflix", 12.99, Recurrence::Monthly)).await }
    });
    while engine.is_empty() {
        tokio::task::yield_now().await;
    }
    let refreshed = engine.refresh().await.expect("refresh");
    assert_eq!(refreshed.value, 0);
    assert!(engine.is_empty());

    gate.notify_one();
    let confirmed = pending.await.unwrap().expect("add");

    assert!(confirmed.is_synced());
    assert_eq!(remote.rows.lock().unwrap().len(), 1);
    let ids: Vec<_> = engine.list().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![confirmed.value.id.clone()]);
    assert_eq!(cache.load().len(), 1);
}

#[tokio::test]
async fn confirmation_for_a_removed_record_is_dropped() {
    let gate = Arc::new(Notify::new());
    let cache = Arc::new(MemoryCacheStore::new());
    let remote = Arc::new(FakeRemote::gated("alice", gate.clone()));
    let engine = engine_for("alice", cache.clone(), remote);

    let pending = tokio::spawn({
        let engine = engine.clone();
        async move { engine.add(draft("Gym", 30.0, Recurrence::Monthly)).await }
    });
    while engine.is_empty() {
        tokio::task::yield_now().await;
    }
    let temporary = engine.list()[0].id.clone();
    let removed = engine.remove(&temporary).await.expect("remove");
    assert!(removed.value.is_some());

    gate.notify_one();
    pending.await.unwrap().expect("add");

    assert!(engine.is_empty());
    assert!(cache.load().is_empty());
}

#[tokio::test]
async fn other_users_cached_records_survive_a_session() {
    let cache = Arc::new(MemoryCacheStore::new());
    let alice = engine_for("alice", cache.clone(), Arc::new(FakeRemote::offline("alice")));
    let offline = alice
        .add(draft("Gym", 30.0, Recurrence::Monthly))
        .await
        .expect("add");
    assert!(!offline.is_synced());

    let factory = |context: &SessionContext| -> Arc<dyn RemoteStore> {
        Arc::new(FakeRemote::offline(context.owner().as_str()))
    };
    let mut controller = SessionController::new(cache.clone(), Arc::new(factory), "test");
    controller
        .handle(SessionEvent::UserAvailable(UserSession::new("test")))
        .await
        .expect("sandbox session");
    let sandbox = controller.require_engine().expect("engine").clone();
    assert!(sandbox.is_empty());
    let local = sandbox
        .add(draft("Local", 3.0, Recurrence::Monthly))
        .await
        .expect("add");
    assert!(local.is_synced());
    assert_eq!(cache.load().len(), 2);

    controller
        .handle(SessionEvent::UserAvailable(UserSession::new("alice")))
        .await
        .expect("alice session");
    let names: Vec<_> = controller
        .require_engine()
        .expect("engine")
        .list()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["Gym".to_string()]);
    assert_eq!(cache.load().len(), 2);
}

#[tokio::test]
async fn add_with_unreachable_remote_keeps_local_record() {
    let cache = Arc::new(MemoryCacheStore::new());
    let engine = engine_for("alice", cache.clone(), Arc::new(FakeRemote::offline("alice")));

    let outcome = engine
        .add(draft("Gym", 30.0, Recurrence::Monthly))
        .await
        .expect("add");

    match &outcome.advisory {
        Some(SyncAdvisory::NotSynced { ids, .. }) => assert_eq!(ids, &vec![outcome.value.id.clone()]),
        other => panic!("expected NotSynced advisory, got {other:?}"),
    }
    assert_eq!(engine.list(), vec![outcome.value.clone()]);
    assert_eq!(cache.load(), vec![outcome.value]);
}

#[tokio::test]
async fn add_rejects_invalid_draft_without_touching_stores() {
    let cache = Arc::new(MemoryCacheStore::new());
    let remote = Arc::new(FakeRemote::new("alice"));
    let engine = engine_for("alice", cache.clone(), remote.clone());
    let mut invalid = draft("Gym", 30.0, Recurrence::Monthly);
    invalid.amount = -1.0;

    let err = engine.add(invalid).await.unwrap_err();

    assert!(matches!(err, CoreError::Validation(_)));
    assert!(engine.is_empty());
    assert!(cache.load().is_empty());
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn import_appends_every_entry_for_the_session_user() {
    let cache = Arc::new(MemoryCacheStore::new());
    let remote = Arc::new(
        FakeRemote::new("alice").with_rows(vec![record("r1", "alice", "Existing", 4.0)]),
    );
    let engine = engine_for("alice", cache.clone(), remote.clone());
    assert!(engine.refresh().await.expect("refresh").is_synced());

    let outcome = engine
        .import(vec![
            draft("One", 1.0, Recurrence::Monthly),
            draft("Two", 2.0, Recurrence::Quarterly),
            draft("Three", 3.0, Recurrence::Yearly),
        ])
        .await
        .expect("import");

    assert_eq!(outcome.value, 3);
    assert!(outcome.is_synced());
    assert_eq!(engine.len(), 4);
    assert!(engine.list().iter().all(|r| r.owner.as_str() == "alice"));
    assert_eq!(cache.load().len(), 4);
    assert_eq!(remote.calls(), vec!["list", "insert_many", "list"]);
}

#[tokio::test]
async fn import_with_unreachable_remote_reports_every_local_id() {
    let cache = Arc::new(MemoryCacheStore::new());
    let engine = engine_for("alice", cache, Arc::new(FakeRemote::offline("alice")));

    let outcome = engine
        .import(vec![
            draft("One", 1.0, Recurrence::Monthly),
            draft("Two", 2.0, Recurrence::Monthly),
        ])
        .await
        .expect("import");

    match outcome.advisory {
        Some(SyncAdvisory::NotSynced { ids, .. }) => assert_eq!(ids.len(), 2),
        other => panic!("expected NotSynced advisory, got {other:?}"),
    }
    assert_eq!(engine.len(), 2);
}

#[tokio::test]
async fn import_rejects_the_whole_batch_on_a_bad_entry() {
    let engine = engine_for(
        "alice",
        Arc::new(MemoryCacheStore::new()),
        Arc::new(FakeRemote::new("alice")),
    );
    let mut bad = draft("Bad", 1.0, Recurrence::Monthly);
    bad.name = "  ".into();

    let err = engine
        .import(vec![draft("Good", 1.0, Recurrence::Monthly), bad])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CoreError::Validation(subfox_domain::ValidationError::ImportEntry { index: 1, .. })
    ));
    assert!(engine.is_empty());
}

#[tokio::test]
async fn update_keeps_local_change_when_remote_fails() {
    let cache = Arc::new(MemoryCacheStore::with_records(vec![record(
        "c1", "alice", "Gym", 30.0,
    )]));
    let engine = engine_for("alice", cache.clone(), Arc::new(FakeRemote::offline("alice")));
    let patch = SubscriptionPatch {
        amount: Some(35.0),
        ..SubscriptionPatch::default()
    };

    let outcome = engine
        .update(&SubscriptionId::from("c1"), patch)
        .await
        .expect("update");

    assert!(!outcome.is_synced());
    assert_eq!(outcome.value.amount, 35.0);
    assert_eq!(engine.list()[0].amount, 35.0);
    assert_eq!(cache.load()[0].amount, 35.0);
}

#[tokio::test]
async fn update_of_unknown_id_is_not_found() {
    let remote = Arc::new(FakeRemote::new("alice"));
    let engine = engine_for("alice", Arc::new(MemoryCacheStore::new()), remote.clone());
    let patch = SubscriptionPatch {
        name: Some("Renamed".into()),
        ..SubscriptionPatch::default()
    };

    let err = engine
        .update(&SubscriptionId::from("missing"), patch)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::NotFound(_)));
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn remove_of_unknown_id_is_a_silent_no_op() {
    let cache = Arc::new(MemoryCacheStore::with_records(vec![record(
        "c1", "alice", "Gym", 30.0,
    )]));
    let remote = Arc::new(FakeRemote::new("alice"));
    let engine = engine_for("alice", cache, remote.clone());

    let outcome = engine
        .remove(&SubscriptionId::from("missing"))
        .await
        .expect("remove");

    assert_eq!(outcome.value, None);
    assert!(outcome.is_synced());
    assert_eq!(engine.len(), 1);
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn remove_deletes_locally_and_remotely() {
    let rows = vec![record("r1", "alice", "Gym", 30.0)];
    let remote = Arc::new(FakeRemote::new("alice").with_rows(rows));
    let cache = Arc::new(MemoryCacheStore::new());
    let engine = engine_for("alice", cache.clone(), remote.clone());
    assert!(engine.refresh().await.expect("refresh").is_synced());

    let outcome = engine
        .remove(&SubscriptionId::from("r1"))
        .await
        .expect("remove");

    assert_eq!(outcome.value.map(|r| r.name), Some("Gym".to_string()));
    assert!(engine.is_empty());
    assert!(cache.load().is_empty());
    assert!(remote.rows.lock().unwrap().is_empty());
}

#[tokio::test]
async fn sandbox_session_never_contacts_the_backend() {
    let connected = Arc::new(AtomicBool::new(false));
    let factory = {
        let connected = connected.clone();
        move |context: &SessionContext| -> Arc<dyn RemoteStore> {
            connected.store(true, Ordering::SeqCst);
            Arc::new(FakeRemote::new(context.owner().as_str()))
        }
    };
    let cache = Arc::new(MemoryCacheStore::new());
    let mut controller = SessionController::new(cache.clone(), Arc::new(factory), "test");

    let initial = controller
        .handle(SessionEvent::UserAvailable(UserSession::new("test")))
        .await
        .expect("start session")
        .expect("initial refresh");
    assert_eq!(initial.value, 0);

    let engine = controller.require_engine().expect("engine");
    assert!(engine.context().is_sandbox());
    let added = engine
        .add(draft("Local", 3.0, Recurrence::Monthly))
        .await
        .expect("add");
    assert!(added.is_synced());
    let imported = engine
        .import(vec![draft("Batch", 4.0, Recurrence::Yearly)])
        .await
        .expect("import");

    assert!(imported.is_synced());
    assert_eq!(engine.len(), 2);
    assert_eq!(cache.load().len(), 2);
    assert!(!connected.load(Ordering::SeqCst));
}

#[tokio::test]
async fn user_absent_drops_the_engine() {
    let factory = |context: &SessionContext| -> Arc<dyn RemoteStore> {
        Arc::new(FakeRemote::new(context.owner().as_str()))
    };
    let mut controller =
        SessionController::new(Arc::new(MemoryCacheStore::new()), Arc::new(factory), "test");

    controller
        .handle(SessionEvent::UserAvailable(UserSession::new("alice")))
        .await
        .expect("start");
    assert_eq!(controller.current_user().map(OwnerId::as_str), Some("alice"));

    controller
        .handle(SessionEvent::UserAbsent)
        .await
        .expect("stop");
    assert!(controller.engine().is_none());
    assert!(matches!(
        controller.require_engine(),
        Err(CoreError::NoSession)
    ));
}

#[tokio::test]
async fn follow_tracks_the_latest_session() {
    let factory = |context: &SessionContext| -> Arc<dyn RemoteStore> {
        Arc::new(FakeRemote::new(context.owner().as_str()))
    };
    let mut controller =
        SessionController::new(Arc::new(MemoryCacheStore::new()), Arc::new(factory), "test");
    let (sender, receiver) = watch::channel(Some(UserSession::new("bob")));
    drop(sender);

    controller.follow(receiver).await.expect("follow");

    assert_eq!(controller.current_user().map(OwnerId::as_str), Some("bob"));
}

#[test]
fn summary_normalizes_to_monthly_and_groups_by_tag() {
    let monthly = record("a", "alice", "Music", 12.0);
    let yearly = Subscription::from_draft(
        SubscriptionId::from("b"),
        OwnerId::new("alice"),
        draft("Cloud", 120.0, Recurrence::Yearly).with_tags(["work"]),
    );
    let records = vec![monthly, yearly];

    let summary = SummaryService::summarize(&records);

    assert_eq!(summary.count, 2);
    assert!((summary.total_monthly - 22.0).abs() < 1e-9);
    assert!((summary.total_yearly - 264.0).abs() < 1e-9);
    assert!((summary.by_tag[UNCATEGORIZED] - 12.0).abs() < 1e-9);
    assert!((summary.by_tag["work"] - 10.0).abs() < 1e-9);
    assert!((summary.by_currency[&eur()] - 22.0).abs() < 1e-9);
}

#[test]
fn multi_tag_records_count_towards_every_tag() {
    let records = vec![
        Subscription::from_draft(
            SubscriptionId::from("a"),
            OwnerId::new("alice"),
            draft("Bundle", 30.0, Recurrence::Quarterly).with_tags(["video", "music"]),
        ),
        record("b", "alice", "Plain", 6.0),
    ];

    let by_tag = SummaryService::by_tag(&records);
    let tag_total: f64 = by_tag.values().sum();

    assert_eq!(by_tag.len(), 3);
    assert!((by_tag["video"] - 10.0).abs() < 1e-9);
    assert!((by_tag["music"] - 10.0).abs() < 1e-9);
    assert!(tag_total >= SummaryService::total_monthly(&records));
}

#[test]
fn empty_collection_summarizes_to_zero() {
    let summary = SummaryService::summarize(&[]);

    assert_eq!(summary.count, 0);
    assert_eq!(summary.total_monthly, 0.0);
    assert!(summary.by_tag.is_empty());
}
