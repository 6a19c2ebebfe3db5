//! Application context: one hydrated session store and the pipeline bound to it.

use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::Config;
use crate::error::ClientError;
use crate::http::{ReqwestTransport, RequestPipeline, Transport};
use crate::models::{LoginRequest, UpdateUserRequest, User};
use crate::notify::{Navigator, Notifier};
use crate::session::{FileSessionStorage, SessionSnapshot, SessionStorage, SessionStore};

pub struct Client {
    store: Arc<SessionStore>,
    api: ApiClient,
}

impl Client {
    /// Build the production client: file-backed session, reqwest transport.
    pub fn from_config(
        config: &Config,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ClientError> {
        let storage = Arc::new(FileSessionStorage::open(&config.session.path)?);
        let transport = Arc::new(ReqwestTransport::new(&config.api)?);
        tracing::debug!(
            base_url = %config.api.base_url,
            session = %config.session.path.display(),
            "Client configured"
        );
        Self::with_parts(storage, transport, notifier, navigator)
    }

    /// Assemble a client from explicit parts and hydrate the session.
    pub fn with_parts(
        storage: Arc<dyn SessionStorage>,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ClientError> {
        let store = Arc::new(SessionStore::open(storage)?);
        let pipeline = RequestPipeline::standard(transport, store.clone(), notifier, navigator);
        Ok(Self {
            store,
            api: ApiClient::new(Arc::new(pipeline)),
        })
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.store.snapshot()
    }

    pub async fn login(&self, credentials: LoginRequest) -> Result<User, ClientError> {
        self.store.login(&self.api.auth(), credentials).await
    }

    pub fn logout(&self) {
        self.store.logout();
    }

    /// Fetch the current identity from the backend and store it.
    pub async fn refresh_profile(&self) -> Result<User, ClientError> {
        let user = self.api.users().profile().await?;
        self.store.update_user(user.clone())?;
        Ok(user)
    }

    pub async fn update_profile(&self, update: &UpdateUserRequest) -> Result<User, ClientError> {
        let user = self.api.users().update_profile(update).await?;
        self.store.update_user(user.clone())?;
        Ok(user)
    }

    /// Flush the session and release the in-memory copy.
    pub fn shutdown(&self) {
        self.store.teardown();
    }
}
