//! Ordered middleware chain around a [`Transport`].
//!
//! Middleware is registered outermost first. `before_send` hooks run in
//! registration order, then the transport, then `after_receive` hooks in
//! reverse order. If a `before_send` hook fails, the transport is skipped and
//! only the hooks that already ran see the error on the way out.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;

use super::{ApiRequest, RawResponse, Transport, TransportError};
use crate::error::{ClientError, NETWORK_ERROR_MESSAGE};
use crate::models::{Envelope, RawEnvelope};

pub const CLIENT_REQUESTS_TOTAL: &str = "client_requests_total";

#[async_trait]
pub trait Middleware: Send + Sync {
    fn name(&self) -> &'static str;

    async fn before_send(&self, _request: &mut ApiRequest) -> Result<(), ClientError> {
        Ok(())
    }

    async fn after_receive(
        &self,
        _request: &ApiRequest,
        outcome: Result<RawResponse, ClientError>,
    ) -> Result<RawResponse, ClientError> {
        outcome
    }
}

pub struct RequestPipeline {
    transport: Arc<dyn Transport>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl RequestPipeline {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            middleware: Vec::new(),
        }
    }

    /// Append a stage inside the ones already registered.
    pub fn with(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }

    /// Run a request through the chain and return the raw 2xx response.
    pub async fn send(&self, mut request: ApiRequest) -> Result<RawResponse, ClientError> {
        let started = Instant::now();

        let mut entered = 0;
        let mut outcome: Option<Result<RawResponse, ClientError>> = None;
        for middleware in &self.middleware {
            if let Err(e) = middleware.before_send(&mut request).await {
                tracing::debug!(stage = middleware.name(), error = %e, "Pre-send stage failed");
                outcome = Some(Err(e));
                break;
            }
            entered += 1;
        }

        let mut outcome = match outcome {
            Some(failed) => failed,
            None => classify(self.transport.send(&request).await),
        };

        for middleware in self.middleware[..entered].iter().rev() {
            outcome = middleware.after_receive(&request, outcome).await;
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(response) => {
                tracing::debug!(
                    method = %request.method,
                    path = %request.path,
                    status = response.status,
                    elapsed_ms,
                    "Request completed"
                );
                metrics::counter!(CLIENT_REQUESTS_TOTAL, "outcome" => "success").increment(1);
            }
            Err(e) => {
                tracing::debug!(
                    method = %request.method,
                    path = %request.path,
                    kind = e.kind().as_str(),
                    error = %e,
                    elapsed_ms,
                    "Request failed"
                );
                metrics::counter!(CLIENT_REQUESTS_TOTAL, "outcome" => e.kind().as_str())
                    .increment(1);
            }
        }

        outcome
    }

    /// Run a request and decode the envelope with a typed payload.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<Envelope<T>, ClientError> {
        let response = self.send(request).await?;
        Ok(serde_json::from_str(&response.body)?)
    }

    /// Run a request and return its payload, failing if `data` is absent.
    pub async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        self.execute(request).await?.into_data()
    }

    /// Run a request whose payload is irrelevant (deletes, status updates).
    pub async fn call(&self, request: ApiRequest) -> Result<(), ClientError> {
        self.send(request).await.map(|_| ())
    }
}

/// Turn the transport result into the pipeline's outcome: 2xx passes through,
/// any other status becomes [`ClientError::Http`] carrying the envelope message
/// when there is one, and no response at all becomes a network error.
fn classify(result: Result<RawResponse, TransportError>) -> Result<RawResponse, ClientError> {
    match result {
        Ok(response) if response.is_success() => Ok(response),
        Ok(response) => {
            let message = serde_json::from_str::<RawEnvelope>(&response.body)
                .ok()
                .map(|envelope| envelope.message)
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| NETWORK_ERROR_MESSAGE.to_string());
            Err(ClientError::Http {
                status: response.status,
                message,
            })
        }
        Err(e) => {
            tracing::warn!(error = %e, "No response from server");
            Err(ClientError::Network(NETWORK_ERROR_MESSAGE.to_string()))
        }
    }
}
