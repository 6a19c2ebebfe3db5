use crate::error::ClientError;
use crate::http::{ApiRequest, RequestPipeline};
use crate::models::{CreateProjectRequest, PageParams, Paginated, Project, UpdateProjectRequest};
use crate::validation::validate_create_project_request;

pub struct ProjectsApi<'a> {
    pipeline: &'a RequestPipeline,
}

impl<'a> ProjectsApi<'a> {
    pub fn new(pipeline: &'a RequestPipeline) -> Self {
        Self { pipeline }
    }

    pub async fn list(&self, page: PageParams) -> Result<Paginated<Project>, ClientError> {
        self.pipeline
            .fetch(ApiRequest::get("/projects").page(page))
            .await
    }

    /// Projects owned by the current user. Not paginated.
    pub async fn mine(&self) -> Result<Vec<Project>, ClientError> {
        self.pipeline.fetch(ApiRequest::get("/projects/my")).await
    }

    pub async fn create(&self, request: &CreateProjectRequest) -> Result<Project, ClientError> {
        validate_create_project_request(request)?;
        self.pipeline
            .fetch(ApiRequest::post("/projects").json(request)?)
            .await
    }

    pub async fn get(&self, id: i64) -> Result<Project, ClientError> {
        self.pipeline
            .fetch(ApiRequest::get(format!("/projects/{}", id)))
            .await
    }

    pub async fn update(
        &self,
        id: i64,
        update: &UpdateProjectRequest,
    ) -> Result<Project, ClientError> {
        self.pipeline
            .fetch(ApiRequest::put(format!("/projects/{}", id)).json(update)?)
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientError> {
        self.pipeline
            .call(ApiRequest::delete(format!("/projects/{}", id)))
            .await
    }
}
