//! Standard pipeline stages.
//!
//! [`RequestPipeline::standard`](super::RequestPipeline::standard) registers
//! them outermost first as:
//!
//! 1. [`ErrorNotice`]: surfaces every rejected call once
//! 2. [`BearerAuth`]: attaches the persisted token
//! 3. [`SessionExpiry`]: turns a 401 into a cleared session and a redirect
//! 4. [`EnvelopeCheck`]: rejects 2xx responses whose envelope code is a failure

use async_trait::async_trait;
use std::sync::Arc;

use super::pipeline::{Middleware, RequestPipeline};
use super::{ApiRequest, RawResponse, Transport};
use crate::error::{ClientError, REQUEST_FAILED_MESSAGE};
use crate::models::RawEnvelope;
use crate::notify::{Navigator, Notifier};
use crate::session::{SessionStorage, SessionStore, StorageKey};

/// Attaches `Authorization: Bearer <token>` when storage holds a token.
pub struct BearerAuth {
    storage: Arc<dyn SessionStorage>,
}

impl BearerAuth {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl Middleware for BearerAuth {
    fn name(&self) -> &'static str {
        "bearer_auth"
    }

    async fn before_send(&self, request: &mut ApiRequest) -> Result<(), ClientError> {
        match self.storage.get(StorageKey::Token)? {
            Some(token) if !token.is_empty() => request.set_bearer(&token),
            _ => Ok(()),
        }
    }
}

/// Rejects a successful transport response whose envelope code is not 200/201.
pub struct EnvelopeCheck;

#[async_trait]
impl Middleware for EnvelopeCheck {
    fn name(&self) -> &'static str {
        "envelope_check"
    }

    async fn after_receive(
        &self,
        _request: &ApiRequest,
        outcome: Result<RawResponse, ClientError>,
    ) -> Result<RawResponse, ClientError> {
        let response = outcome?;
        let envelope: RawEnvelope = serde_json::from_str(&response.body)
            .map_err(|e| ClientError::Decode(format!("response is not an API envelope: {}", e)))?;

        if envelope.is_success() {
            return Ok(response);
        }

        let message = if envelope.message.is_empty() {
            REQUEST_FAILED_MESSAGE.to_string()
        } else {
            envelope.message
        };
        Err(ClientError::Api {
            code: envelope.code,
            message,
        })
    }
}

/// Clears the session and sends the user to login when the backend answers 401.
///
/// The login call itself is exempt: a 401 there is a credential rejection and
/// is left for the session store to report.
pub struct SessionExpiry {
    store: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
}

impl SessionExpiry {
    pub fn new(store: Arc<SessionStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self { store, navigator }
    }
}

#[async_trait]
impl Middleware for SessionExpiry {
    fn name(&self) -> &'static str {
        "session_expiry"
    }

    async fn after_receive(
        &self,
        request: &ApiRequest,
        outcome: Result<RawResponse, ClientError>,
    ) -> Result<RawResponse, ClientError> {
        match outcome {
            Err(ClientError::Http { status: 401, .. }) if !request.credentials_exchange => {
                tracing::warn!(path = %request.path, "Server rejected the session token");
                if self.store.expire(request.bearer_token.as_deref()) {
                    self.navigator.redirect_to_login();
                }
                Err(ClientError::SessionExpired)
            }
            other => other,
        }
    }
}

/// Emits one error notification for every call that ends in failure.
pub struct ErrorNotice {
    notifier: Arc<dyn Notifier>,
}

impl ErrorNotice {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl Middleware for ErrorNotice {
    fn name(&self) -> &'static str {
        "error_notice"
    }

    async fn after_receive(
        &self,
        _request: &ApiRequest,
        outcome: Result<RawResponse, ClientError>,
    ) -> Result<RawResponse, ClientError> {
        if let Err(e) = &outcome {
            self.notifier.error(&e.user_message());
        }
        outcome
    }
}

impl RequestPipeline {
    /// The production chain: notice, auth, expiry, envelope check.
    pub fn standard(
        transport: Arc<dyn Transport>,
        store: Arc<SessionStore>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let storage = store.storage();
        RequestPipeline::new(transport)
            .with(ErrorNotice::new(notifier))
            .with(BearerAuth::new(storage))
            .with(SessionExpiry::new(store, navigator))
            .with(EnvelopeCheck)
    }
}
