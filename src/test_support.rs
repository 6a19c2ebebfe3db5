//! Scripted doubles shared by the unit tests.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::oneshot;

use crate::error::ClientError;
use crate::http::{ApiRequest, RawResponse, Transport, TransportError};
use crate::models::{LoginRequest, LoginResponse, Role, User};
use crate::notify::{Navigator, NoticeLevel, Notifier};
use crate::session::{Authenticator, MemorySessionStorage, SessionStorage, StorageKey};

pub fn sample_user(id: i64, username: &str) -> User {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    User {
        id,
        username: username.to_string(),
        email: format!("{}@example.com", username),
        role: if username == "admin" {
            Role::Admin
        } else {
            Role::User
        },
        active: true,
        created_at: at,
        updated_at: at,
    }
}

/// Replays queued responses in order and records every request it sees.
/// An empty queue answers with a connect failure.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_json(&self, status: u16, body: &str) {
        self.responses
            .lock()
            .push_back(Ok(RawResponse::new(status, body)));
    }

    pub fn push_error(&self, error: TransportError) {
        self.responses.lock().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        self.requests.lock().push(request.clone());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Connect("no scripted response".to_string())))
    }
}

enum Outcome {
    Accept(LoginResponse),
    Reject(Mutex<Option<ClientError>>),
}

pub struct StaticAuthenticator {
    outcome: Outcome,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    calls: AtomicUsize,
}

impl StaticAuthenticator {
    pub fn accepting(token: &str, user: User) -> Self {
        Self {
            outcome: Outcome::Accept(LoginResponse {
                token: token.to_string(),
                user,
            }),
            gate: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fails the first call with `error`; later calls fail as unreachable.
    pub fn rejecting(error: ClientError) -> Self {
        Self {
            outcome: Outcome::Reject(Mutex::new(Some(error))),
            gate: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Accepts, but only after the returned sender fires.
    pub fn gated(token: &str, user: User) -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        let auth = Self::accepting(token, user);
        *auth.gate.lock() = Some(rx);
        (auth, tx)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, _credentials: &LoginRequest) -> Result<LoginResponse, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().take();
        if let Some(rx) = gate {
            let _ = rx.await;
        }

        match &self.outcome {
            Outcome::Accept(response) => Ok(response.clone()),
            Outcome::Reject(error) => Err(error
                .lock()
                .take()
                .unwrap_or_else(|| ClientError::Network("Network error".to_string()))),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<(NoticeLevel, String)>>,
}

impl RecordingNotifier {
    pub fn errors(&self) -> Vec<String> {
        self.notices
            .lock()
            .iter()
            .filter(|(level, _)| *level == NoticeLevel::Error)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        self.notices.lock().push((level, message.to_string()));
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    redirects: AtomicUsize,
}

impl RecordingNavigator {
    pub fn redirects(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Navigator for RecordingNavigator {
    fn redirect_to_login(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

/// Memory storage whose user writes always fail, leaving token writes alone.
#[derive(Default)]
pub struct UserWriteFailingStorage {
    inner: MemorySessionStorage,
}

impl SessionStorage for UserWriteFailingStorage {
    fn get(&self, key: StorageKey) -> Result<Option<String>, ClientError> {
        self.inner.get(key)
    }

    fn set(&self, key: StorageKey, value: &str) -> Result<(), ClientError> {
        match key {
            StorageKey::User => Err(ClientError::Storage("disk full".to_string())),
            StorageKey::Token => self.inner.set(key, value),
        }
    }

    fn remove(&self, key: StorageKey) -> Result<(), ClientError> {
        self.inner.remove(key)
    }
}
