use crate::error::ClientError;
use crate::http::{ApiRequest, RequestPipeline};
use crate::models::{
    Build, BuildStatus, BuildStep, PageParams, Paginated, TriggerBuildRequest,
    UpdateBuildStatusRequest,
};
use crate::validation::validate_trigger_build_request;

pub struct BuildsApi<'a> {
    pipeline: &'a RequestPipeline,
}

impl<'a> BuildsApi<'a> {
    pub fn new(pipeline: &'a RequestPipeline) -> Self {
        Self { pipeline }
    }

    pub async fn list(&self, page: PageParams) -> Result<Paginated<Build>, ClientError> {
        self.pipeline
            .fetch(ApiRequest::get("/builds").page(page))
            .await
    }

    pub async fn by_pipeline(
        &self,
        pipeline_id: i64,
        page: PageParams,
    ) -> Result<Paginated<Build>, ClientError> {
        self.pipeline
            .fetch(ApiRequest::get(format!("/builds/pipeline/{}", pipeline_id)).page(page))
            .await
    }

    pub async fn trigger(&self, request: &TriggerBuildRequest) -> Result<Build, ClientError> {
        validate_trigger_build_request(request)?;
        self.pipeline
            .fetch(ApiRequest::post("/builds").json(request)?)
            .await
    }

    pub async fn get(&self, id: i64) -> Result<Build, ClientError> {
        self.pipeline
            .fetch(ApiRequest::get(format!("/builds/{}", id)))
            .await
    }

    pub async fn steps(&self, id: i64) -> Result<Vec<BuildStep>, ClientError> {
        self.pipeline
            .fetch(ApiRequest::get(format!("/builds/{}/steps", id)))
            .await
    }

    pub async fn update_status(&self, id: i64, status: BuildStatus) -> Result<(), ClientError> {
        let body = UpdateBuildStatusRequest { status };
        self.pipeline
            .call(ApiRequest::put(format!("/builds/{}/status", id)).json(&body)?)
            .await
    }

    pub async fn cancel(&self, id: i64) -> Result<(), ClientError> {
        self.update_status(id, BuildStatus::Canceled).await
    }
}
