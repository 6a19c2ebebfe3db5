//! Typed access to the backend's REST endpoints.
//!
//! Every call goes through the shared [`RequestPipeline`], so auth, envelope
//! checks, session expiry and notices apply uniformly. Resource groups are
//! thin borrowed views over the pipeline:
//!
//! ```ignore
//! let projects = api.projects().list(PageParams::default()).await?;
//! ```

pub mod auth;
pub mod builds;
pub mod dashboard;
pub mod pipelines;
pub mod projects;
pub mod users;

pub use auth::AuthApi;
pub use builds::BuildsApi;
pub use dashboard::{DashboardApi, DashboardSummary};
pub use pipelines::PipelinesApi;
pub use projects::ProjectsApi;
pub use users::UsersApi;

use std::sync::Arc;

use crate::http::RequestPipeline;

#[derive(Clone)]
pub struct ApiClient {
    pipeline: Arc<RequestPipeline>,
}

impl ApiClient {
    pub fn new(pipeline: Arc<RequestPipeline>) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }

    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(&self.pipeline)
    }

    pub fn users(&self) -> UsersApi<'_> {
        UsersApi::new(&self.pipeline)
    }

    pub fn projects(&self) -> ProjectsApi<'_> {
        ProjectsApi::new(&self.pipeline)
    }

    pub fn pipelines(&self) -> PipelinesApi<'_> {
        PipelinesApi::new(&self.pipeline)
    }

    pub fn builds(&self) -> BuildsApi<'_> {
        BuildsApi::new(&self.pipeline)
    }

    pub fn dashboard(&self) -> DashboardApi<'_> {
        DashboardApi::new(self)
    }
}
