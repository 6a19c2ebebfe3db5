//! Client-side session lifecycle.
//!
//! A [`SessionStore`] is an explicit context object: it is created empty,
//! hydrated from a [`SessionStorage`] backend, shared through `Arc` with
//! whatever needs it, and torn down when the client shuts down. In-memory
//! mutation and persistence are separate steps; the store calls
//! [`SessionStore::save`]/[`SessionStore::load`] deliberately.
//!
//! State machine:
//!
//! ```text
//! Anonymous --login--> Authenticating --ok--> Authenticated
//!                            |                     |
//!                            +--error--> previous  +--logout / 401--> Anonymous
//! ```

pub mod storage;

pub use storage::{FileSessionStorage, MemorySessionStorage, SessionStorage, StorageKey};

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::ClientError;
use crate::models::{LoginRequest, LoginResponse, User};
use crate::validation::validate_login_request;

pub const SESSION_TRANSITIONS_TOTAL: &str = "session_transitions_total";

/// The current identity and credential.
///
/// `authenticated` is derived from the two fields, so it is true exactly when
/// both a user and a token are present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub token: Option<String>,
}

impl Session {
    pub fn new(user: User, token: String) -> Self {
        Self {
            user: Some(user),
            token: Some(token),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => write!(f, "anonymous"),
            Self::Authenticating => write!(f, "authenticating"),
            Self::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// Point-in-time view published to subscribers on every change.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub token: Option<String>,
    pub authenticated: bool,
    pub loading: bool,
    pub state: SessionState,
}

/// Exchanges credentials for a token and identity.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, credentials: &LoginRequest) -> Result<LoginResponse, ClientError>;
}

#[derive(Debug, Default)]
struct Inner {
    session: Session,
    loading: bool,
}

impl Inner {
    fn state(&self) -> SessionState {
        if self.loading {
            SessionState::Authenticating
        } else if self.session.is_authenticated() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            user: self.session.user.clone(),
            token: self.session.token.clone(),
            authenticated: self.session.is_authenticated(),
            loading: self.loading,
            state: self.state(),
        }
    }
}

pub struct SessionStore {
    inner: Mutex<Inner>,
    storage: Arc<dyn SessionStorage>,
    changes: watch::Sender<SessionSnapshot>,
}

impl SessionStore {
    /// Create an empty (anonymous) store. Nothing is read from storage until
    /// [`hydrate`](Self::hydrate) is called.
    pub fn create(storage: Arc<dyn SessionStorage>) -> Self {
        let inner = Inner::default();
        let (changes, _) = watch::channel(inner.snapshot());
        Self {
            inner: Mutex::new(inner),
            storage,
            changes,
        }
    }

    /// Create a store and hydrate it from storage in one step.
    pub fn open(storage: Arc<dyn SessionStorage>) -> Result<Self, ClientError> {
        let store = Self::create(storage);
        store.hydrate()?;
        Ok(store)
    }

    pub fn storage(&self) -> Arc<dyn SessionStorage> {
        Arc::clone(&self.storage)
    }

    /// Replace the in-memory session with what storage holds.
    ///
    /// A partial or undecodable persisted session (token without user, or a
    /// user that no longer parses) is discarded and storage is cleared.
    pub fn hydrate(&self) -> Result<SessionState, ClientError> {
        let mut inner = self.inner.lock();
        let loaded = match self.load() {
            Ok(session) => session,
            Err(ClientError::Decode(reason)) => {
                tracing::warn!(reason = %reason, "Discarding unreadable persisted session");
                self.storage.clear()?;
                Session::default()
            }
            Err(e) => return Err(e),
        };

        let session = if loaded.is_authenticated() {
            loaded
        } else {
            if loaded != Session::default() {
                tracing::warn!("Discarding incomplete persisted session");
                self.storage.clear()?;
            }
            Session::default()
        };

        inner.session = session;
        tracing::debug!(
            authenticated = inner.session.is_authenticated(),
            "Session hydrated from storage"
        );
        let state = inner.state();
        self.publish(&inner);
        Ok(state)
    }

    /// Read the persisted session without applying it.
    pub fn load(&self) -> Result<Session, ClientError> {
        let token = self.storage.get(StorageKey::Token)?;
        let user = match self.storage.get(StorageKey::User)? {
            Some(raw) => Some(serde_json::from_str::<User>(&raw)?),
            None => None,
        };
        Ok(Session { user, token })
    }

    /// Persist the current in-memory session.
    pub fn save(&self) -> Result<(), ClientError> {
        let inner = self.inner.lock();
        self.persist(&inner.session)
    }

    /// Flush the session to storage and drop the in-memory copy.
    pub fn teardown(&self) {
        let mut inner = self.inner.lock();
        if let Err(e) = self.persist(&inner.session) {
            tracing::warn!(error = %e, "Failed to flush session during teardown");
        }
        inner.session = Session::default();
        inner.loading = false;
        self.publish(&inner);
    }

    /// Authenticate and, on success, persist and apply the new session.
    ///
    /// Fails with a validation error (no request sent) when the form is
    /// invalid, with [`ClientError::LoginInProgress`] when another login is
    /// in flight, and with [`ClientError::Authentication`] when the backend
    /// rejects the credentials or cannot be reached. A malformed login
    /// payload surfaces as [`ClientError::Decode`]. On failure the previous
    /// session is left as it was, in memory and in storage.
    pub async fn login(
        &self,
        authenticator: &dyn Authenticator,
        credentials: LoginRequest,
    ) -> Result<User, ClientError> {
        validate_login_request(&credentials)?;

        {
            let mut inner = self.inner.lock();
            if inner.loading {
                return Err(ClientError::LoginInProgress);
            }
            inner.loading = true;
            self.publish(&inner);
        }
        let _in_flight = InFlightGuard { store: self };

        tracing::info!(username = %credentials.username, "Logging in");

        let response = match authenticator.authenticate(&credentials).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(username = %credentials.username, error = %e, "Login failed");
                metrics::counter!(SESSION_TRANSITIONS_TOTAL, "transition" => "login_failed")
                    .increment(1);
                return Err(into_authentication_error(e));
            }
        };

        let session = Session::new(response.user, response.token);
        let mut inner = self.inner.lock();
        if let Err(e) = self.persist(&session) {
            tracing::warn!(username = %credentials.username, error = %e, "Failed to persist new session");
            metrics::counter!(SESSION_TRANSITIONS_TOTAL, "transition" => "login_failed")
                .increment(1);
            return Err(e);
        }
        inner.session = session;
        inner.loading = false;
        self.publish(&inner);

        metrics::counter!(SESSION_TRANSITIONS_TOTAL, "transition" => "login").increment(1);
        let user = inner
            .session
            .user
            .clone()
            .ok_or_else(|| ClientError::Decode("login response carried no user".to_string()))?;
        tracing::info!(username = %user.username, role = %user.role, "Logged in");
        Ok(user)
    }

    /// Clear persisted credentials and reset to anonymous. Idempotent.
    pub fn logout(&self) {
        let mut inner = self.inner.lock();
        if let Err(e) = self.storage.clear() {
            tracing::warn!(error = %e, "Failed to clear persisted session");
        }
        let was_authenticated = inner.session.is_authenticated();
        inner.session = Session::default();
        inner.loading = false;
        self.publish(&inner);

        if was_authenticated {
            metrics::counter!(SESSION_TRANSITIONS_TOTAL, "transition" => "logout").increment(1);
            tracing::info!("Logged out");
        }
    }

    /// Replace the stored identity; the token is untouched.
    pub fn update_user(&self, user: User) -> Result<(), ClientError> {
        let mut inner = self.inner.lock();
        if !inner.session.is_authenticated() {
            return Err(ClientError::NotAuthenticated);
        }
        self.storage
            .set(StorageKey::User, &serde_json::to_string(&user)?)?;
        inner.session.user = Some(user);
        self.publish(&inner);
        Ok(())
    }

    /// Reset the session after the backend rejected `token_used`.
    ///
    /// When the session already moved on to a different token (a login
    /// completed after the failing request was sent), nothing is cleared and
    /// `false` is returned. Otherwise the session is cleared and `true` is
    /// returned.
    pub fn expire(&self, token_used: Option<&str>) -> bool {
        let mut inner = self.inner.lock();

        if let Some(current) = inner.session.token.as_deref() {
            if Some(current) != token_used {
                tracing::debug!("Ignoring 401 for a superseded token");
                return false;
            }
        }

        match self.storage.get(StorageKey::Token) {
            Ok(stored) if stored.is_none() || stored.as_deref() == token_used => {
                if let Err(e) = self.storage.clear() {
                    tracing::warn!(error = %e, "Failed to clear persisted session");
                }
            }
            Ok(_) => tracing::debug!("Persisted token changed since request; leaving it"),
            Err(e) => tracing::warn!(error = %e, "Failed to read persisted token"),
        }

        let was_authenticated = inner.session.is_authenticated();
        inner.session = Session::default();
        self.publish(&inner);

        if was_authenticated {
            metrics::counter!(SESSION_TRANSITIONS_TOTAL, "transition" => "expired").increment(1);
            tracing::info!("Session expired");
        }
        true
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().snapshot()
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.lock().session.is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.lock().loading
    }

    pub fn token(&self) -> Option<String> {
        self.inner.lock().session.token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.inner.lock().session.user.clone()
    }

    /// Receive a snapshot after every session change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.changes.subscribe()
    }

    fn persist(&self, session: &Session) -> Result<(), ClientError> {
        match (&session.token, &session.user) {
            (Some(token), Some(user)) => {
                let user_json = serde_json::to_string(user)?;
                self.storage.set_session(token, &user_json)
            }
            _ => self.storage.clear(),
        }
    }

    fn publish(&self, inner: &Inner) {
        self.changes.send_replace(inner.snapshot());
    }
}

/// Clears the in-flight flag however `login` exits, including cancellation.
struct InFlightGuard<'a> {
    store: &'a SessionStore,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.store.inner.lock();
        if inner.loading {
            inner.loading = false;
            self.store.publish(&inner);
        }
    }
}

fn into_authentication_error(err: ClientError) -> ClientError {
    match err {
        ClientError::Validation(_)
        | ClientError::Storage(_)
        | ClientError::Decode(_)
        | ClientError::Authentication(_) => err,
        other => ClientError::Authentication(other.user_message()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_user, StaticAuthenticator, UserWriteFailingStorage};

    fn store_with_memory() -> (SessionStore, Arc<MemorySessionStorage>) {
        let storage = Arc::new(MemorySessionStorage::new());
        let store = SessionStore::create(storage.clone());
        (store, storage)
    }

    #[tokio::test]
    async fn test_login_success_persists_token_and_user() {
        let (store, storage) = store_with_memory();
        let auth = StaticAuthenticator::accepting("t1", sample_user(1, "admin"));

        let user = store
            .login(&auth, LoginRequest::new("admin", "admin123"))
            .await
            .unwrap();

        assert_eq!(user.username, "admin");
        let snapshot = store.snapshot();
        assert!(snapshot.authenticated);
        assert_eq!(snapshot.token.as_deref(), Some("t1"));
        assert_eq!(snapshot.state, SessionState::Authenticated);
        assert!(!snapshot.loading);

        assert_eq!(storage.get(StorageKey::Token).unwrap().as_deref(), Some("t1"));
        let persisted: User =
            serde_json::from_str(&storage.get(StorageKey::User).unwrap().unwrap()).unwrap();
        assert_eq!(persisted, user);
    }

    #[tokio::test]
    async fn test_login_failure_leaves_anonymous() {
        let (store, storage) = store_with_memory();
        let auth = StaticAuthenticator::rejecting(ClientError::Http {
            status: 401,
            message: "invalid username or password".to_string(),
        });

        let err = store
            .login(&auth, LoginRequest::new("admin", "wrongpass"))
            .await
            .unwrap_err();

        match err {
            ClientError::Authentication(message) => {
                assert_eq!(message, "invalid username or password")
            }
            other => panic!("expected authentication error, got {:?}", other),
        }
        assert!(!store.is_authenticated());
        assert!(!store.is_loading());
        assert_eq!(store.state(), SessionState::Anonymous);
        assert_eq!(storage.get(StorageKey::Token).unwrap(), None);
    }

    #[tokio::test]
    async fn test_login_network_failure_is_authentication_error() {
        let (store, _) = store_with_memory();
        let auth = StaticAuthenticator::rejecting(ClientError::Network("Network error".into()));

        let err = store
            .login(&auth, LoginRequest::new("admin", "admin123"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_failed_relogin_keeps_previous_session() {
        let (store, _) = store_with_memory();
        let ok = StaticAuthenticator::accepting("t1", sample_user(1, "admin"));
        store.login(&ok, LoginRequest::new("admin", "admin123")).await.unwrap();

        let bad = StaticAuthenticator::rejecting(ClientError::Api {
            code: 401,
            message: "bad credentials".to_string(),
        });
        assert!(store
            .login(&bad, LoginRequest::new("other", "secret99"))
            .await
            .is_err());

        assert_eq!(store.state(), SessionState::Authenticated);
        assert_eq!(store.token().as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn test_login_with_unwritable_user_persists_no_token() {
        let storage = Arc::new(UserWriteFailingStorage::default());
        let store = SessionStore::create(storage.clone());
        let auth = StaticAuthenticator::accepting("t2", sample_user(2, "dev"));

        let err = store
            .login(&auth, LoginRequest::new("dev", "secret99"))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Storage(_)));
        assert!(!store.is_authenticated());
        assert!(!store.is_loading());
        assert_eq!(store.token(), None);
        assert_eq!(storage.get(StorageKey::Token).unwrap(), None);
    }

    #[tokio::test]
    async fn test_unwritable_relogin_keeps_previous_token_on_disk() {
        let storage = Arc::new(UserWriteFailingStorage::default());
        storage.set(StorageKey::Token, "t1").unwrap();
        let store = SessionStore::create(storage.clone());
        let auth = StaticAuthenticator::accepting("t2", sample_user(2, "dev"));

        assert!(store
            .login(&auth, LoginRequest::new("dev", "secret99"))
            .await
            .is_err());
        assert_eq!(storage.get(StorageKey::Token).unwrap().as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn test_malformed_login_payload_stays_decode_error() {
        let (store, storage) = store_with_memory();
        let auth = StaticAuthenticator::rejecting(ClientError::Decode(
            "missing field `user`".to_string(),
        ));

        let err = store
            .login(&auth, LoginRequest::new("admin", "admin123"))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Decode(_)));
        assert!(!store.is_authenticated());
        assert_eq!(storage.get(StorageKey::Token).unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_form_never_calls_authenticator() {
        let (store, _) = store_with_memory();
        let auth = StaticAuthenticator::accepting("t1", sample_user(1, "admin"));

        let err = store
            .login(&auth, LoginRequest::new("ad", "123"))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Validation(_)));
        assert_eq!(auth.calls(), 0);
        assert_eq!(store.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_concurrent_login_is_rejected() {
        let (store, _) = store_with_memory();
        let store = Arc::new(store);
        let (auth, release) = StaticAuthenticator::gated("t1", sample_user(1, "admin"));
        let auth = Arc::new(auth);

        let first = {
            let store = store.clone();
            let auth = auth.clone();
            tokio::spawn(async move {
                store
                    .login(auth.as_ref(), LoginRequest::new("admin", "admin123"))
                    .await
            })
        };

        let mut changes = store.subscribe();
        changes
            .wait_for(|s| s.state == SessionState::Authenticating)
            .await
            .unwrap();

        let second = store
            .login(auth.as_ref(), LoginRequest::new("admin", "admin123"))
            .await;
        assert!(matches!(second, Err(ClientError::LoginInProgress)));

        release.send(()).unwrap();
        assert!(first.await.unwrap().is_ok());
        assert_eq!(store.state(), SessionState::Authenticated);
    }

    #[test]
    fn test_logout_is_idempotent() {
        let storage = Arc::new(MemorySessionStorage::new());
        storage.set(StorageKey::Token, "t1").unwrap();
        storage
            .set(
                StorageKey::User,
                &serde_json::to_string(&sample_user(1, "admin")).unwrap(),
            )
            .unwrap();
        let store = SessionStore::open(storage.clone()).unwrap();
        assert!(store.is_authenticated());

        store.logout();
        let first = store.snapshot();
        store.logout();
        let second = store.snapshot();

        assert_eq!(first, second);
        assert!(!second.authenticated);
        assert_eq!(second.token, None);
        assert_eq!(storage.get(StorageKey::Token).unwrap(), None);
        assert_eq!(storage.get(StorageKey::User).unwrap(), None);
    }

    #[test]
    fn test_hydrate_discards_token_without_user() {
        let storage = Arc::new(MemorySessionStorage::new());
        storage.set(StorageKey::Token, "orphan").unwrap();

        let store = SessionStore::create(storage.clone());
        assert_eq!(store.hydrate().unwrap(), SessionState::Anonymous);
        assert_eq!(storage.get(StorageKey::Token).unwrap(), None);
    }

    #[test]
    fn test_hydrate_discards_unreadable_user() {
        let storage = Arc::new(MemorySessionStorage::new());
        storage.set(StorageKey::Token, "t1").unwrap();
        storage.set(StorageKey::User, "{not json").unwrap();

        let store = SessionStore::create(storage.clone());
        assert_eq!(store.hydrate().unwrap(), SessionState::Anonymous);
        assert_eq!(storage.get(StorageKey::User).unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_user_keeps_token() {
        let (store, storage) = store_with_memory();
        let auth = StaticAuthenticator::accepting("t1", sample_user(1, "admin"));
        store.login(&auth, LoginRequest::new("admin", "admin123")).await.unwrap();

        let mut updated = sample_user(1, "admin");
        updated.email = "root@example.com".to_string();
        store.update_user(updated.clone()).unwrap();

        assert_eq!(store.user(), Some(updated.clone()));
        assert_eq!(store.token().as_deref(), Some("t1"));
        assert!(store.is_authenticated());
        let persisted: User =
            serde_json::from_str(&storage.get(StorageKey::User).unwrap().unwrap()).unwrap();
        assert_eq!(persisted.email, "root@example.com");
    }

    #[test]
    fn test_update_user_requires_session() {
        let (store, storage) = store_with_memory();
        let err = store.update_user(sample_user(1, "admin")).unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated));
        assert_eq!(storage.get(StorageKey::User).unwrap(), None);
    }

    #[tokio::test]
    async fn test_expire_clears_current_token() {
        let (store, storage) = store_with_memory();
        let auth = StaticAuthenticator::accepting("t1", sample_user(1, "admin"));
        store.login(&auth, LoginRequest::new("admin", "admin123")).await.unwrap();

        assert!(store.expire(Some("t1")));
        assert!(!store.is_authenticated());
        assert_eq!(storage.get(StorageKey::Token).unwrap(), None);
    }

    #[tokio::test]
    async fn test_expire_ignores_superseded_token() {
        let (store, storage) = store_with_memory();
        let auth = StaticAuthenticator::accepting("t2", sample_user(1, "admin"));
        store.login(&auth, LoginRequest::new("admin", "admin123")).await.unwrap();

        assert!(!store.expire(Some("t1")));
        assert!(store.is_authenticated());
        assert_eq!(storage.get(StorageKey::Token).unwrap().as_deref(), Some("t2"));
    }

    #[test]
    fn test_teardown_flushes_and_resets() {
        let storage = Arc::new(MemorySessionStorage::new());
        storage.set(StorageKey::Token, "t1").unwrap();
        storage
            .set(
                StorageKey::User,
                &serde_json::to_string(&sample_user(1, "admin")).unwrap(),
            )
            .unwrap();
        let store = SessionStore::open(storage.clone()).unwrap();

        store.teardown();
        assert!(!store.is_authenticated());
        assert_eq!(storage.get(StorageKey::Token).unwrap().as_deref(), Some("t1"));

        let reopened = SessionStore::open(storage).unwrap();
        assert!(reopened.is_authenticated());
    }

    #[tokio::test]
    async fn test_subscribers_see_login_and_logout() {
        let (store, _) = store_with_memory();
        let mut changes = store.subscribe();
        assert!(!changes.borrow_and_update().authenticated);

        let auth = StaticAuthenticator::accepting("t1", sample_user(1, "admin"));
        store.login(&auth, LoginRequest::new("admin", "admin123")).await.unwrap();
        assert!(changes.has_changed().unwrap());
        assert!(changes.borrow_and_update().authenticated);

        store.logout();
        assert!(!changes.borrow_and_update().authenticated);
    }
}
