//! Informational handlers

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
};
use chrono::Utc;
use hook_api::{AppConfigInfo, HealthResponse, TestResponse, VersionResponse};
use tracing::info;

use crate::server::response::pretty_json;
use crate::server::state::ServerState;
use crate::utils::version_info;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>renderhook</title>
</head>
<body>
  <h1>renderhook</h1>
  <p>Push webhook receiver for Render deploys.</p>
  <p>Send <code>POST /webhook?token=&lt;token&gt;&amp;project=&lt;project&gt;</code>
     with a JSON body containing <code>push_data</code>.</p>
</body>
</html>
"#;

/// Info page
pub async fn index_handler() -> impl IntoResponse {
    info!("Index page requested");
    Html(INDEX_HTML)
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    pretty_json(
        StatusCode::OK,
        &HealthResponse {
            status: "healthy".to_string(),
            service: "renderhook".to_string(),
            version: version.version,
        },
    )
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    pretty_json(
        StatusCode::OK,
        &VersionResponse {
            version: version.version,
            git_hash: version.git_hash,
            build_time: version.build_time,
        },
    )
}

/// Configuration summary; lists only projects with a credential
pub async fn test_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    info!("Test request received");
    let projects = state.settings.projects.configured_ids();
    pretty_json(
        StatusCode::OK,
        &TestResponse {
            message: "This is a test response".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            app_config: AppConfigInfo {
                base_url: state.settings.base_url.clone(),
                project_count: projects.len(),
                projects,
            },
        },
    )
}
