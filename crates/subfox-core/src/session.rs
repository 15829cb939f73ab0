//! Session lifecycle: one engine per authenticated user.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use subfox_domain::OwnerId;
use tokio::sync::watch;
use tracing::info;

use crate::{
    remote::{NullAdapter, RemoteFactory, RemoteStore},
    storage::CacheStore,
    sync_engine::{SyncEngine, Synced},
    CoreError,
};

/// Identity handed over by the authentication collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    pub user_id: OwnerId,
    pub access_token: Option<String>,
}

impl UserSession {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: OwnerId::new(user_id),
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

/// Notifications emitted by the authentication collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    UserAvailable(UserSession),
    UserAbsent,
}

/// Per-session state shared by the engine and its adapter.
#[derive(Debug, Clone)]
pub struct SessionContext {
    session: UserSession,
    sandbox: bool,
    started_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(session: UserSession, sandbox_user: &str) -> Self {
        let sandbox = session.user_id.as_str() == sandbox_user;
        Self {
            session,
            sandbox,
            started_at: Utc::now(),
        }
    }

    pub fn owner(&self) -> &OwnerId {
        &self.session.user_id
    }

    pub fn access_token(&self) -> Option<&str> {
        self.session.access_token.as_deref()
    }

    pub fn is_sandbox(&self) -> bool {
        self.sandbox
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

/// Owns the engine for the current user. Creates it when a user becomes
/// available and drops it (clearing the collection) when the user goes away.
pub struct SessionController {
    cache: Arc<dyn CacheStore>,
    remotes: Arc<dyn RemoteFactory>,
    sandbox_user: String,
    engine: Option<SyncEngine>,
}

impl SessionController {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        remotes: Arc<dyn RemoteFactory>,
        sandbox_user: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            remotes,
            sandbox_user: sandbox_user.into(),
            engine: None,
        }
    }

    pub fn engine(&self) -> Option<&SyncEngine> {
        self.engine.as_ref()
    }

    pub fn require_engine(&self) -> Result<&SyncEngine, CoreError> {
        self.engine.as_ref().ok_or(CoreError::NoSession)
    }

    pub fn current_user(&self) -> Option<&OwnerId> {
        self.engine.as_ref().map(|engine| engine.context().owner())
    }

    /// Reacts to a session change. For a new user the returned value carries
    /// the outcome of the initial refresh.
    pub async fn handle(&mut self, event: SessionEvent) -> Result<Option<Synced<usize>>, CoreError> {
        match event {
            SessionEvent::UserAvailable(session) => {
                if self.current_user() == Some(&session.user_id) {
                    return Ok(None);
                }
                let engine = self.start(session);
                let outcome = engine.refresh().await?;
                Ok(Some(outcome))
            }
            SessionEvent::UserAbsent => {
                self.stop();
                Ok(None)
            }
        }
    }

    /// Tracks the authentication collaborator until its sender is dropped.
    pub async fn follow(
        &mut self,
        mut sessions: watch::Receiver<Option<UserSession>>,
    ) -> Result<(), CoreError> {
        loop {
            let current = sessions.borrow_and_update().clone();
            let event = match current {
                Some(session) => SessionEvent::UserAvailable(session),
                None => SessionEvent::UserAbsent,
            };
            self.handle(event).await?;
            if sessions.changed().await.is_err() {
                return Ok(());
            }
        }
    }

    fn start(&mut self, session: UserSession) -> SyncEngine {
        self.stop();
        let context = SessionContext::new(session, &self.sandbox_user);
        let remote: Arc<dyn RemoteStore> = if context.is_sandbox() {
            Arc::new(NullAdapter::new(self.cache.clone(), context.owner().clone()))
        } else {
            self.remotes.connect(&context)
        };
        info!(
            user = %context.owner(),
            adapter = remote.kind(),
            "session started"
        );
        let engine = SyncEngine::new(context, self.cache.clone(), remote);
        self.engine = Some(engine.clone());
        engine
    }

    fn stop(&mut self) {
        if let Some(engine) = self.engine.take() {
            info!(user = %engine.context().owner(), "session ended");
        }
    }
}
