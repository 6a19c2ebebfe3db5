use async_trait::async_trait;

use crate::error::ClientError;
use crate::http::{ApiRequest, RequestPipeline};
use crate::models::{LoginRequest, LoginResponse};
use crate::session::Authenticator;
use crate::validation::validate_login_request;

/// Credential exchange against `POST /auth/login`.
pub struct AuthApi<'a> {
    pipeline: &'a RequestPipeline,
}

impl<'a> AuthApi<'a> {
    pub fn new(pipeline: &'a RequestPipeline) -> Self {
        Self { pipeline }
    }

    pub async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, ClientError> {
        validate_login_request(credentials)?;
        let request = ApiRequest::post("/auth/login")
            .json(credentials)?
            .credentials_exchange();
        self.pipeline.fetch(request).await
    }
}

#[async_trait]
impl Authenticator for AuthApi<'_> {
    async fn authenticate(&self, credentials: &LoginRequest) -> Result<LoginResponse, ClientError> {
        self.login(credentials).await
    }
}
