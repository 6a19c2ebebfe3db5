use crate::error::ClientError;
use crate::http::{ApiRequest, RequestPipeline};
use crate::models::{
    CreatePipelineRequest, PageParams, Paginated, Pipeline, UpdatePipelineRequest,
};
use crate::validation::validate_create_pipeline_request;

pub struct PipelinesApi<'a> {
    pipeline: &'a RequestPipeline,
}

impl<'a> PipelinesApi<'a> {
    pub fn new(pipeline: &'a RequestPipeline) -> Self {
        Self { pipeline }
    }

    pub async fn list(&self, page: PageParams) -> Result<Paginated<Pipeline>, ClientError> {
        self.pipeline
            .fetch(ApiRequest::get("/pipelines").page(page))
            .await
    }

    pub async fn by_project(&self, project_id: i64) -> Result<Vec<Pipeline>, ClientError> {
        self.pipeline
            .fetch(ApiRequest::get(format!("/pipelines/project/{}", project_id)))
            .await
    }

    pub async fn create(&self, request: &CreatePipelineRequest) -> Result<Pipeline, ClientError> {
        validate_create_pipeline_request(request)?;
        self.pipeline
            .fetch(ApiRequest::post("/pipelines").json(request)?)
            .await
    }

    pub async fn get(&self, id: i64) -> Result<Pipeline, ClientError> {
        self.pipeline
            .fetch(ApiRequest::get(format!("/pipelines/{}", id)))
            .await
    }

    pub async fn update(
        &self,
        id: i64,
        update: &UpdatePipelineRequest,
    ) -> Result<Pipeline, ClientError> {
        self.pipeline
            .fetch(ApiRequest::put(format!("/pipelines/{}", id)).json(update)?)
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientError> {
        self.pipeline
            .call(ApiRequest::delete(format!("/pipelines/{}", id)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockTransport;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_by_project_path() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(
            200,
            r#"{"code":200,"message":"ok","data":[{"id":4,"project_id":3,"name":"ci",
                "config":"steps: []","is_active":true,
                "created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-01T00:00:00Z"}]}"#,
        );
        let pipeline = RequestPipeline::new(transport.clone());

        let pipelines = PipelinesApi::new(&pipeline).by_project(3).await.unwrap();
        assert_eq!(pipelines[0].name, "ci");
        assert_eq!(transport.requests()[0].path, "/pipelines/project/3");
    }

    #[tokio::test]
    async fn test_create_requires_config() {
        let transport = Arc::new(MockTransport::new());
        let pipeline = RequestPipeline::new(transport.clone());

        let request = CreatePipelineRequest {
            project_id: 3,
            name: "ci".to_string(),
            config: "  ".to_string(),
        };
        let err = PipelinesApi::new(&pipeline).create(&request).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(transport.requests().is_empty());
    }
}
