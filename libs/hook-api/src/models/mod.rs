//! Hook API models

use serde::{Deserialize, Serialize};

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Version response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Error body shared by every failing webhook response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<String>,
    /// Whole seconds until the project may deploy again
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub retry_after: Option<u64>,
    /// Machine readable tag: `deploying`, `rate_limited` or `error`
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            retry_after: None,
            status: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after = Some(secs);
        self
    }
}

/// Deploy accepted; the outcome is reported asynchronously
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingResponse {
    pub message: String,
    pub project: String,
    pub service_name: String,
    pub service_id: String,
    pub status: String,
}

/// Request handled but nothing was deployed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarningResponse {
    pub status: String,
    pub message: String,
}

/// `GET /test` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResponse {
    pub message: String,
    pub timestamp: String,
    pub app_config: AppConfigInfo,
}

/// Public view of the loaded configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfigInfo {
    #[serde(rename = "BASE_URL")]
    pub base_url: String,
    #[serde(rename = "PROJECT_COUNT")]
    pub project_count: usize,
    #[serde(rename = "PROJECTS")]
    pub projects: Vec<String>,
}
