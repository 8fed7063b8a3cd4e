//! Session lifecycle management.
//!
//! [`SessionManager`] is the single source of truth for "is the user signed
//! in". It mediates between the identity-provider client (injected as a
//! [`CredentialStore`] plus an [`InteractiveAuthorizer`]) and whatever host
//! reacts to state changes: consumers read the latest committed [`Session`]
//! without blocking, or [`subscribe`](SessionManager::subscribe) and route
//! between screens when the snapshot changes. The manager itself never
//! performs navigation.
//!
//! Mutating operations (`check_session`, `login`, `logout`) are serialized
//! on one fair lock and drain FIFO; overlapping `login` calls coalesce onto
//! the in-flight attempt so exactly one provider flow runs. The `try_*`
//! variants reject with [`SessionError::Busy`] instead of queueing.

use rsim_observability_core::{NoopObserver, SessionObserver, SessionOperation, SessionTransition};
use rsim_session_core::{
    CredentialStore, InteractiveAuthorizer, Session, SessionError, SessionResult, SessionStatus,
};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, broadcast, watch};
use tracing::{debug, warn};

/// Tuning for the session manager.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Scopes requested on interactive login.
    pub scopes: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scopes: vec![
                "openid".to_string(),
                "profile".to_string(),
                "email".to_string(),
            ],
        }
    }
}

type LoginOutcome = SessionResult<Session>;
type PendingLogin = Arc<StdMutex<Option<broadcast::Sender<LoginOutcome>>>>;

enum LoginAdmission {
    /// Join an in-flight attempt, or queue behind other operations.
    Queue,
    /// Fail with `Busy` instead of waiting.
    Reject,
}

/// Owns the process-wide session state.
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct SessionManager {
    config: Arc<SessionConfig>,
    store: Arc<dyn CredentialStore>,
    authorizer: Arc<dyn InteractiveAuthorizer>,
    observer: Arc<dyn SessionObserver>,
    state: Arc<watch::Sender<Session>>,
    op_lock: Arc<Mutex<()>>,
    pending_login: PendingLogin,
}

impl SessionManager {
    pub fn new(store: Arc<dyn CredentialStore>, authorizer: Arc<dyn InteractiveAuthorizer>) -> Self {
        Self::with_config(SessionConfig::default(), store, authorizer)
    }

    pub fn with_config(
        config: SessionConfig,
        store: Arc<dyn CredentialStore>,
        authorizer: Arc<dyn InteractiveAuthorizer>,
    ) -> Self {
        let (state, _) = watch::channel(Session::unknown());
        Self {
            config: Arc::new(config),
            store,
            authorizer,
            observer: Arc::new(NoopObserver),
            state: Arc::new(state),
            op_lock: Arc::new(Mutex::new(())),
            pending_login: Arc::new(StdMutex::new(None)),
        }
    }

    /// Install a transition observer. Call before sharing the manager.
    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Latest committed session snapshot.
    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Watch committed snapshots; this is the navigation host's interface.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Startup check: recover a previously persisted identity.
    ///
    /// Never fails. A missing, expired, or unreadable credential, or a store
    /// error, all resolve to `Unauthenticated`.
    pub async fn check_session(&self) -> Session {
        let _guard = self.op_lock.lock().await;
        self.transition(Session::checking(), SessionOperation::Check);

        let next = match self.store.load().await {
            Ok(Some(credential)) if !credential.is_expired() => {
                Session::authenticated(credential.identity)
            }
            Ok(Some(_)) => {
                debug!("stored credential expired");
                Session::unauthenticated()
            }
            Ok(None) => Session::unauthenticated(),
            Err(err) => {
                warn!(error = %err, "credential check failed, treating as signed out");
                Session::unauthenticated()
            }
        };

        self.transition(next, SessionOperation::Check)
    }

    /// Run the interactive authorization flow.
    ///
    /// On success the credential is persisted (a save failure is logged and
    /// does not block the transition) and the session becomes
    /// `Authenticated`. On failure the session becomes `Unauthenticated` and
    /// the error is surfaced for user-facing messaging.
    ///
    /// Overlapping calls share one provider flow and observe the same
    /// outcome. The outcome is applied to shared state exactly once even if
    /// every caller stops awaiting.
    pub async fn login(&self) -> SessionResult<Session> {
        let rx = self.join_or_start_login(LoginAdmission::Queue)?;
        Self::await_outcome(rx).await
    }

    /// Like [`login`](Self::login), but fails with [`SessionError::Busy`]
    /// while any session operation is in flight.
    pub async fn try_login(&self) -> SessionResult<Session> {
        let rx = self.join_or_start_login(LoginAdmission::Reject)?;
        Self::await_outcome(rx).await
    }

    /// Sign out. The local session is cleared unconditionally; the
    /// credential clear is best-effort and failures are only logged.
    pub async fn logout(&self) -> Session {
        let _guard = self.op_lock.lock().await;
        self.finish_logout().await
    }

    /// Like [`logout`](Self::logout), but fails with [`SessionError::Busy`]
    /// while any session operation is in flight.
    pub async fn try_logout(&self) -> SessionResult<Session> {
        if self.login_pending() {
            return Err(SessionError::Busy);
        }
        let _guard = self
            .op_lock
            .clone()
            .try_lock_owned()
            .map_err(|_| SessionError::Busy)?;
        Ok(self.finish_logout().await)
    }

    async fn finish_logout(&self) -> Session {
        // Local sign-out commits before the provider clear: the user-visible
        // contract of logout does not depend on the persistence layer.
        let session = self.transition(Session::unauthenticated(), SessionOperation::Logout);
        if let Err(err) = self.store.clear().await {
            warn!(error = %err, "credential clear failed during logout");
        }
        session
    }

    fn login_pending(&self) -> bool {
        self.pending_login
            .lock()
            .expect("pending-login lock poisoned")
            .is_some()
    }

    fn join_or_start_login(
        &self,
        admission: LoginAdmission,
    ) -> SessionResult<broadcast::Receiver<LoginOutcome>> {
        let mut pending = self
            .pending_login
            .lock()
            .expect("pending-login lock poisoned");

        if let Some(tx) = pending.as_ref() {
            return match admission {
                LoginAdmission::Queue => Ok(tx.subscribe()),
                LoginAdmission::Reject => Err(SessionError::Busy),
            };
        }

        let guard = match admission {
            LoginAdmission::Reject => Some(
                self.op_lock
                    .clone()
                    .try_lock_owned()
                    .map_err(|_| SessionError::Busy)?,
            ),
            LoginAdmission::Queue => None,
        };

        let (tx, rx) = broadcast::channel(1);
        *pending = Some(tx.clone());
        drop(pending);

        // The flow runs detached so abandoning callers cannot cancel a
        // half-applied outcome.
        let manager = self.clone();
        tokio::spawn(async move {
            let _guard = match guard {
                Some(guard) => guard,
                None => manager.op_lock.clone().lock_owned().await,
            };
            let reset = PendingLoginReset {
                pending: manager.pending_login.clone(),
            };
            let outcome = manager.login_flow().await;
            drop(reset);
            let _ = tx.send(outcome);
        });

        Ok(rx)
    }

    async fn login_flow(&self) -> SessionResult<Session> {
        self.transition(Session::checking(), SessionOperation::Login);

        match self.authorizer.authorize(&self.config.scopes).await {
            Ok(credential) => {
                if let Err(err) = self.store.save(&credential).await {
                    warn!(error = %err, "credential save failed, session stays authenticated");
                }
                Ok(self.transition(
                    Session::authenticated(credential.identity),
                    SessionOperation::Login,
                ))
            }
            Err(err) => {
                self.transition(Session::unauthenticated(), SessionOperation::Login);
                Err(err)
            }
        }
    }

    async fn await_outcome(mut rx: broadcast::Receiver<LoginOutcome>) -> SessionResult<Session> {
        match rx.recv().await {
            Ok(outcome) => outcome,
            // The flow dropped its sender without publishing; only a panic
            // inside the authorizer can cause this.
            Err(_) => Err(SessionError::Authorization(
                "login attempt aborted".to_string(),
            )),
        }
    }

    fn transition(&self, next: Session, operation: SessionOperation) -> Session {
        let previous = self.state.send_replace(next.clone());
        if previous.status() != next.status() {
            let transition =
                SessionTransition::new(previous.status(), next.status(), operation);
            debug!(
                from = %transition.from,
                to = %transition.to,
                operation = %operation,
                "session transition"
            );
            self.observer.on_transition(&transition);
        }
        next
    }
}

/// Clears the pending-login slot even if the flow unwinds.
struct PendingLoginReset {
    pending: PendingLogin,
}

impl Drop for PendingLoginReset {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            *pending = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use rsim_identity_simulated::{
        MemoryCredentialStore, SIMULATED_SUBJECT, SimulatedAuthorizer,
    };
    use rsim_observability_core::FnObserver;
    use rsim_session_core::{Credential, Identity};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{Notify, RwLock};

    fn credential_for(subject: &str, expires_at: Option<chrono::DateTime<Utc>>) -> Credential {
        Credential {
            access_token: format!("at-{subject}"),
            id_token: None,
            token_type: "Bearer".to_string(),
            expires_at,
            identity: Identity::new(subject),
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        stored: RwLock<Option<Credential>>,
        fail_load: bool,
        fail_save: bool,
        fail_clear: bool,
        saves: AtomicUsize,
        clears: AtomicUsize,
    }

    #[async_trait]
    impl CredentialStore for RecordingStore {
        async fn load(&self) -> SessionResult<Option<Credential>> {
            if self.fail_load {
                return Err(SessionError::Persistence("store offline".to_string()));
            }
            Ok(self.stored.read().await.clone())
        }

        async fn save(&self, credential: &Credential) -> SessionResult<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if self.fail_save {
                return Err(SessionError::Persistence("disk full".to_string()));
            }
            *self.stored.write().await = Some(credential.clone());
            Ok(())
        }

        async fn clear(&self) -> SessionResult<()> {
            self.clears.fetch_add(1, Ordering::SeqCst);
            if self.fail_clear {
                return Err(SessionError::Persistence("store offline".to_string()));
            }
            *self.stored.write().await = None;
            Ok(())
        }
    }

    /// Authorizer that parks inside `authorize` until released.
    struct GatedAuthorizer {
        started: Notify,
        release: Notify,
        calls: AtomicUsize,
    }

    impl GatedAuthorizer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                started: Notify::new(),
                release: Notify::new(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl InteractiveAuthorizer for GatedAuthorizer {
        async fn authorize(&self, _scopes: &[String]) -> SessionResult<Credential> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.started.notify_one();
            self.release.notified().await;
            Ok(credential_for("auth0|gated", None))
        }
    }

    /// Authorizer that replays a scripted list of outcomes.
    struct ScriptedAuthorizer {
        outcomes: StdMutex<Vec<SessionResult<Credential>>>,
    }

    impl ScriptedAuthorizer {
        fn new(mut outcomes: Vec<SessionResult<Credential>>) -> Self {
            outcomes.reverse();
            Self {
                outcomes: StdMutex::new(outcomes),
            }
        }
    }

    #[async_trait]
    impl InteractiveAuthorizer for ScriptedAuthorizer {
        async fn authorize(&self, _scopes: &[String]) -> SessionResult<Credential> {
            self.outcomes
                .lock()
                .unwrap()
                .pop()
                .expect("authorizer called more times than scripted")
        }
    }

    fn simulated_manager() -> SessionManager {
        SessionManager::new(
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(SimulatedAuthorizer::new()),
        )
    }

    fn assert_invariant(manager: &SessionManager) {
        let session = manager.session();
        assert_eq!(session.is_authenticated(), session.identity().is_some());
        assert_eq!(
            manager.is_authenticated(),
            manager.status() == SessionStatus::Authenticated
        );
    }

    #[tokio::test]
    async fn test_initial_state_is_unknown() {
        let manager = simulated_manager();

        assert_eq!(manager.status(), SessionStatus::Unknown);
        assert!(!manager.is_authenticated());
        assert_invariant(&manager);
    }

    #[tokio::test]
    async fn test_check_session_without_stored_credential() {
        let manager = simulated_manager();

        let session = manager.check_session().await;

        assert_eq!(session.status(), SessionStatus::Unauthenticated);
        assert!(session.identity().is_none());
        assert_invariant(&manager);
    }

    #[tokio::test]
    async fn test_check_session_recovers_persisted_identity() {
        let stored = credential_for("auth0|persisted", Some(Utc::now() + Duration::hours(1)));
        let manager = SessionManager::new(
            Arc::new(MemoryCredentialStore::with_credential(stored)),
            Arc::new(SimulatedAuthorizer::new()),
        );

        let session = manager.check_session().await;

        assert_eq!(session.status(), SessionStatus::Authenticated);
        assert_eq!(session.identity().unwrap().subject, "auth0|persisted");
        assert_invariant(&manager);
    }

    #[tokio::test]
    async fn test_check_session_treats_expired_credential_as_signed_out() {
        let stored = credential_for("auth0|stale", Some(Utc::now() - Duration::hours(1)));
        let manager = SessionManager::new(
            Arc::new(MemoryCredentialStore::with_credential(stored)),
            Arc::new(SimulatedAuthorizer::new()),
        );

        let session = manager.check_session().await;

        assert_eq!(session.status(), SessionStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn test_check_session_absorbs_store_failure() {
        let store = Arc::new(RecordingStore {
            fail_load: true,
            ..RecordingStore::default()
        });
        let manager = SessionManager::new(store, Arc::new(SimulatedAuthorizer::new()));

        // Never errors: a broken store reads as "not signed in".
        let session = manager.check_session().await;

        assert_eq!(session.status(), SessionStatus::Unauthenticated);
        assert_invariant(&manager);
    }

    #[tokio::test]
    async fn test_login_persists_credential_and_authenticates() {
        let store = Arc::new(RecordingStore::default());
        let manager =
            SessionManager::new(store.clone(), Arc::new(SimulatedAuthorizer::new()));

        let session = manager.login().await.unwrap();

        assert_eq!(session.status(), SessionStatus::Authenticated);
        assert_eq!(session.identity().unwrap().subject, SIMULATED_SUBJECT);
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
        assert_invariant(&manager);

        // The persisted credential now survives a restart-style check.
        let session = manager.check_session().await;
        assert_eq!(session.identity().unwrap().subject, SIMULATED_SUBJECT);
    }

    #[tokio::test]
    async fn test_login_failure_surfaces_and_next_attempt_succeeds() {
        let authorizer = ScriptedAuthorizer::new(vec![
            Err(SessionError::Authorization("provider rejected".to_string())),
            Ok(credential_for("auth0|retry", None)),
        ]);
        let manager = SessionManager::new(
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(authorizer),
        );

        let err = manager.login().await.unwrap_err();
        assert!(matches!(err, SessionError::Authorization(_)));
        assert_eq!(manager.status(), SessionStatus::Unauthenticated);
        assert_invariant(&manager);

        let session = manager.login().await.unwrap();
        assert_eq!(session.identity().unwrap().subject, "auth0|retry");
    }

    #[tokio::test]
    async fn test_login_save_failure_does_not_block_transition() {
        let store = Arc::new(RecordingStore {
            fail_save: true,
            ..RecordingStore::default()
        });
        let manager =
            SessionManager::new(store.clone(), Arc::new(SimulatedAuthorizer::new()));

        let session = manager.login().await.unwrap();

        assert_eq!(session.status(), SessionStatus::Authenticated);
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_logout_clears_session_even_when_store_fails() {
        let store = Arc::new(RecordingStore {
            fail_clear: true,
            ..RecordingStore::default()
        });
        let manager =
            SessionManager::new(store.clone(), Arc::new(SimulatedAuthorizer::new()));

        manager.login().await.unwrap();
        assert!(manager.is_authenticated());

        let session = manager.logout().await;

        assert_eq!(session.status(), SessionStatus::Unauthenticated);
        assert!(!manager.is_authenticated());
        assert_eq!(store.clears.load(Ordering::SeqCst), 1);
        assert_invariant(&manager);
    }

    #[tokio::test]
    async fn test_logout_from_fresh_state() {
        let manager = simulated_manager();

        let session = manager.logout().await;

        assert_eq!(session.status(), SessionStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn test_concurrent_logins_share_one_flow() {
        let authorizer = GatedAuthorizer::new();
        let manager = SessionManager::new(
            Arc::new(MemoryCredentialStore::new()),
            authorizer.clone(),
        );

        let first = tokio::spawn({
            let manager = manager.clone();
            async move { manager.login().await }
        });
        authorizer.started.notified().await;
        assert_eq!(manager.status(), SessionStatus::Checking);

        let second = tokio::spawn({
            let manager = manager.clone();
            async move { manager.login().await }
        });
        // Let the second caller attach to the in-flight attempt.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        authorizer.release.notify_one();

        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();

        assert_eq!(authorizer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.identity().unwrap().subject, "auth0|gated");
        assert_eq!(second, first);
        assert!(manager.is_authenticated());
    }

    #[tokio::test]
    async fn test_try_login_rejects_while_login_in_flight() {
        let authorizer = GatedAuthorizer::new();
        let manager = SessionManager::new(
            Arc::new(MemoryCredentialStore::new()),
            authorizer.clone(),
        );

        let pending = tokio::spawn({
            let manager = manager.clone();
            async move { manager.login().await }
        });
        authorizer.started.notified().await;

        assert!(matches!(manager.try_login().await, Err(SessionError::Busy)));
        assert!(matches!(manager.try_logout().await, Err(SessionError::Busy)));

        authorizer.release.notify_one();
        let session = pending.await.unwrap().unwrap();
        assert_eq!(session.status(), SessionStatus::Authenticated);

        // With nothing in flight the try variants work again.
        let session = manager.try_logout().await.unwrap();
        assert_eq!(session.status(), SessionStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn test_abandoned_login_outcome_still_applies() {
        let authorizer = GatedAuthorizer::new();
        let manager = SessionManager::new(
            Arc::new(MemoryCredentialStore::new()),
            authorizer.clone(),
        );

        let caller = tokio::spawn({
            let manager = manager.clone();
            async move { manager.login().await }
        });
        authorizer.started.notified().await;

        // The caller walks away mid-flight.
        caller.abort();
        authorizer.release.notify_one();

        let mut updates = manager.subscribe();
        let session = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            updates.wait_for(|session| session.is_authenticated()),
        )
        .await
        .expect("login outcome was never applied")
        .unwrap()
        .clone();

        assert_eq!(session.identity().unwrap().subject, "auth0|gated");
        assert_invariant(&manager);
    }

    #[tokio::test]
    async fn test_observer_sees_the_full_transition_sequence() {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        let manager = simulated_manager().with_observer(Arc::new(FnObserver::new(
            move |transition: &SessionTransition| {
                sink.lock().unwrap().push((transition.from, transition.to));
            },
        )));

        manager.check_session().await;
        manager.login().await.unwrap();
        manager.logout().await;

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (SessionStatus::Unknown, SessionStatus::Checking),
                (SessionStatus::Checking, SessionStatus::Unauthenticated),
                (SessionStatus::Unauthenticated, SessionStatus::Checking),
                (SessionStatus::Checking, SessionStatus::Authenticated),
                (SessionStatus::Authenticated, SessionStatus::Unauthenticated),
            ]
        );
    }

    #[tokio::test]
    async fn test_subscriber_observes_login_commit() {
        let manager = simulated_manager();
        let mut updates = manager.subscribe();

        let outcome = manager.login().await;
        tokio_test::assert_ok!(outcome);

        let session = updates
            .wait_for(|session| session.is_authenticated())
            .await
            .unwrap()
            .clone();
        assert_eq!(session.identity().unwrap().subject, SIMULATED_SUBJECT);
    }
}
