use crate::error::ClientError;
use crate::http::{ApiRequest, RequestPipeline};
use crate::models::{CreateUserRequest, PageParams, Paginated, UpdateUserRequest, User};
use crate::validation::validate_create_user_request;

pub struct UsersApi<'a> {
    pipeline: &'a RequestPipeline,
}

impl<'a> UsersApi<'a> {
    pub fn new(pipeline: &'a RequestPipeline) -> Self {
        Self { pipeline }
    }

    /// The identity behind the current token.
    pub async fn profile(&self) -> Result<User, ClientError> {
        self.pipeline.fetch(ApiRequest::get("/users/profile")).await
    }

    pub async fn update_profile(&self, update: &UpdateUserRequest) -> Result<User, ClientError> {
        self.pipeline
            .fetch(ApiRequest::put("/users/profile").json(update)?)
            .await
    }

    pub async fn list(&self, page: PageParams) -> Result<Paginated<User>, ClientError> {
        self.pipeline.fetch(ApiRequest::get("/users").page(page)).await
    }

    pub async fn create(&self, request: &CreateUserRequest) -> Result<User, ClientError> {
        validate_create_user_request(request)?;
        self.pipeline
            .fetch(ApiRequest::post("/users").json(request)?)
            .await
    }

    pub async fn get(&self, id: i64) -> Result<User, ClientError> {
        self.pipeline
            .fetch(ApiRequest::get(format!("/users/{}", id)))
            .await
    }

    pub async fn update(&self, id: i64, update: &UpdateUserRequest) -> Result<User, ClientError> {
        self.pipeline
            .fetch(ApiRequest::put(format!("/users/{}", id)).json(update)?)
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientError> {
        self.pipeline
            .call(ApiRequest::delete(format!("/users/{}", id)))
            .await
    }
}
