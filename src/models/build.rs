//! Build and build step models.
//!
//! Status values are reported by the backend; the client only displays and
//! filters them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Pending,
    Running,
    Success,
    Failed,
    Canceled,
}

impl BuildStatus {
    pub const ALL: [BuildStatus; 5] = [
        Self::Pending,
        Self::Running,
        Self::Success,
        Self::Failed,
        Self::Canceled,
    ];

    /// Whether the build has reached a state it will not leave.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Canceled)
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

impl std::str::FromStr for BuildStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "canceled" | "cancelled" => Ok(Self::Canceled),
            _ => Err(format!("Unknown build status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Build {
    pub id: i64,
    pub pipeline_id: i64,
    pub branch: String,
    #[serde(default)]
    pub commit: String,
    pub status: BuildStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    /// Duration in seconds, present once the build finished
    #[serde(default)]
    pub duration: Option<i64>,
    pub trigger_by: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildStep {
    pub id: i64,
    pub build_id: i64,
    pub name: String,
    pub command: String,
    pub status: StepStatus,
    #[serde(default)]
    pub output: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: Option<i64>,
    pub step_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerBuildRequest {
    pub pipeline_id: i64,
    pub branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBuildStatusRequest {
    pub status: BuildStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_status_roundtrip_names() {
        for status in BuildStatus::ALL {
            assert_eq!(status.to_string().parse::<BuildStatus>().unwrap(), status);
        }
        assert_eq!("cancelled".parse::<BuildStatus>().unwrap(), BuildStatus::Canceled);
        assert!("queued".parse::<BuildStatus>().is_err());
    }

    #[test]
    fn test_build_status_finished() {
        assert!(!BuildStatus::Pending.is_finished());
        assert!(!BuildStatus::Running.is_finished());
        assert!(BuildStatus::Failed.is_finished());
    }

    #[test]
    fn test_running_build_without_finish_fields() {
        let json = r#"{
            "id": 7,
            "pipeline_id": 3,
            "branch": "main",
            "commit": "abc123",
            "status": "running",
            "started_at": "2024-03-01T10:00:00Z",
            "trigger_by": 1,
            "created_at": "2024-03-01T10:00:00Z"
        }"#;
        let build: Build = serde_json::from_str(json).unwrap();
        assert_eq!(build.status, BuildStatus::Running);
        assert!(build.finished_at.is_none());
        assert!(build.duration.is_none());
    }

    #[test]
    fn test_trigger_request_omits_missing_commit() {
        let req = TriggerBuildRequest {
            pipeline_id: 2,
            branch: "main".to_string(),
            commit: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"pipeline_id": 2, "branch": "main"}));
    }
}
