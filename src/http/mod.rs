//! Outbound request plumbing.
//!
//! - [`ApiRequest`]/[`RawResponse`]: transport-neutral request and response
//! - [`Transport`]: the seam to the network, implemented by [`ReqwestTransport`]
//! - [`pipeline`]: ordered middleware chain around a transport
//! - [`middleware`]: the auth, envelope, expiry and notice stages

pub mod middleware;
pub mod pipeline;

pub use middleware::{BearerAuth, EnvelopeCheck, ErrorNotice, SessionExpiry};
pub use pipeline::{Middleware, RequestPipeline};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::Serialize;

use crate::config::ApiConfig;
use crate::error::ClientError;
use crate::models::PageParams;

/// An outbound API call, before it is bound to a concrete HTTP client.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the configured base URL, starting with `/`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
    /// Token attached at pre-send, if any
    pub bearer_token: Option<String>,
    /// Set for the login call: a 401 there means bad credentials, not an
    /// expired session
    pub credentials_exchange: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            bearer_token: None,
            credentials_exchange: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn page(mut self, page: PageParams) -> Self {
        self.query.extend(page.to_query());
        self
    }

    pub fn credentials_exchange(mut self) -> Self {
        self.credentials_exchange = true;
        self
    }

    /// Attach `Authorization: Bearer <token>` and remember the token.
    pub fn set_bearer(&mut self, token: &str) -> Result<(), ClientError> {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ClientError::Storage("persisted token is not a valid header value".into()))?;
        self.headers.insert(AUTHORIZATION, value);
        self.bearer_token = Some(token.to_string());
        Ok(())
    }
}

/// What came back over the wire, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A call that produced no HTTP response at all.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError>;
}

/// Transport backed by a shared `reqwest::Client` with a fixed per-call deadline.
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(config: &ApiConfig) -> Result<Self, ClientError> {
        reqwest::Url::parse(&config.base_url).map_err(|e| {
            ClientError::Config(format!("invalid base URL '{}': {}", config.base_url, e))
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ClientError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        let url = self.url_for(&request.path);
        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(request.headers.clone());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_reqwest_error)?;

        Ok(RawResponse { status, body })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}
