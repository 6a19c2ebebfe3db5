//! Aggregated overview shown by `vortexia dashboard`.

use futures::try_join;

use super::ApiClient;
use crate::error::ClientError;
use crate::models::{Build, BuildStatus, PageParams};

/// How many of the latest builds the overview includes.
pub const RECENT_BUILDS: u32 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub total_projects: u64,
    pub total_pipelines: u64,
    pub total_builds: u64,
    pub recent_builds: Vec<Build>,
}

impl DashboardSummary {
    /// Count of recent builds per status, in [`BuildStatus::ALL`] order.
    pub fn recent_by_status(&self) -> Vec<(BuildStatus, usize)> {
        BuildStatus::ALL
            .iter()
            .map(|status| {
                let count = self
                    .recent_builds
                    .iter()
                    .filter(|b| b.status == *status)
                    .count();
                (*status, count)
            })
            .collect()
    }

    pub fn running(&self) -> usize {
        self.recent_builds
            .iter()
            .filter(|b| b.status == BuildStatus::Running)
            .count()
    }
}

pub struct DashboardApi<'a> {
    api: &'a ApiClient,
}

impl<'a> DashboardApi<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    /// Fetch the three list endpoints concurrently; the first failure wins.
    pub async fn summary(&self) -> Result<DashboardSummary, ClientError> {
        let probe = PageParams::new(1, 1);
        let projects = self.api.projects();
        let pipelines = self.api.pipelines();
        let builds = self.api.builds();

        let (projects, pipelines, builds) = try_join!(
            projects.list(probe),
            pipelines.list(probe),
            builds.list(PageParams::new(1, RECENT_BUILDS)),
        )?;

        Ok(DashboardSummary {
            total_projects: projects.total,
            total_pipelines: pipelines.total,
            total_builds: builds.total,
            recent_builds: builds.items,
        })
    }
}
