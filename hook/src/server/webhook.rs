//! Push webhook handler
//!
//! Validates the request, passes the project's deploy gate, triggers the
//! deploy and hands it to the monitor worker. The response never waits for
//! the deploy to finish.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use chrono::Utc;
use hook_api::{PendingResponse, WarningResponse};
use render_api::ServiceFilter;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::models::attempt::DeployAttempt;
use crate::models::project::Project;
use crate::notify::message::DeployNotification;
use crate::server::errors::WebhookError;
use crate::server::response::pretty_json;
use crate::server::state::ServerState;

/// Webhook query parameters
#[derive(Debug, Deserialize)]
pub struct WebhookQuery {
    pub token: Option<String>,
    pub project: Option<String>,
}

/// `POST /webhook?token=..&project=..`
pub async fn webhook_handler(
    State(state): State<Arc<ServerState>>,
    query: Result<Query<WebhookQuery>, QueryRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, WebhookError> {
    info!("Webhook request received");

    if !is_json_request(&headers) {
        warn!("Rejected webhook with non JSON Content-Type");
        return Err(WebhookError::InvalidContentType);
    }

    let Query(query) = query.map_err(|e| {
        warn!(error = %e.body_text(), "Rejected webhook with malformed query");
        WebhookError::InvalidQuery(e.body_text())
    })?;

    let token = query
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or(WebhookError::MissingToken)?;
    if !state.settings.token_matches(token) {
        warn!("Rejected webhook with invalid token");
        return Err(WebhookError::InvalidToken);
    }

    let project_id = query.project.unwrap_or_default();
    let Some(project) = state.settings.projects.get(&project_id) else {
        warn!(project = %project_id, "Rejected webhook for unknown project");
        return Err(WebhookError::UnknownProject(project_id));
    };

    check_payload(&body)?;

    let lock = state.gate.try_acquire(&project.id).await.inspect_err(|e| {
        warn!(project = %project.id, "{}", e);
    })?;
    info!(project = %project.id, "Deploy lock acquired");

    let result = deploy_locked(&state, project).await;
    state.gate.release(lock);
    result
}

/// Critical section, runs with the project's lock held
async fn deploy_locked(state: &ServerState, project: &Project) -> Result<Response, WebhookError> {
    let now = Utc::now();
    state
        .gate
        .check_cooldown(&project.id, now, state.settings.deploy_interval)
        .await
        .inspect_err(|e| warn!(project = %project.id, "{}", e))?;
    state.gate.record_acceptance(&project.id, now).await?;

    if !project.has_credential() {
        error!(project = %project.id, "Project has no API key");
        return Err(WebhookError::MissingCredential(project.id.clone()));
    }
    let api_key = project.api_key();

    let services = state
        .client
        .list_services(api_key, ServiceFilter::All)
        .await
        .map_err(|e| WebhookError::ServiceLookup(e.to_string()))?;

    let Some(service) = services.into_iter().next() else {
        warn!(project = %project.id, "No deployed service found");
        return Ok(pretty_json(
            StatusCode::OK,
            &WarningResponse {
                status: "warning".to_string(),
                message: "No deployed service found, deploy the project on Render first"
                    .to_string(),
            },
        ));
    };

    let service_name = service.name.unwrap_or_else(|| project.name.clone());
    let Some(service_id) = service.id.filter(|id| !id.is_empty()) else {
        error!(project = %project.id, service_name = %service_name, "Service has no id");
        return Err(WebhookError::MissingServiceId(project.id.clone()));
    };

    info!(project = %project.id, service_id = %service_id, service_name = %service_name, "Triggering deploy");
    let deploy = match state.client.trigger_deploy(&service_id, api_key).await {
        Ok(deploy) => deploy,
        Err(e) => {
            error!(project = %project.id, service_id = %service_id, error = %e, "Deploy trigger failed");
            notify_trigger_failure(state, project, &service_name, e.to_string());
            return Err(WebhookError::TriggerFailed(e.to_string()));
        }
    };

    let attempt = DeployAttempt::new(
        project.id.clone(),
        service_id.clone(),
        service_name.clone(),
        deploy.id,
        SecretString::from(api_key.expose_secret().to_string()),
    );
    info!(
        project = %project.id,
        attempt_id = %attempt.attempt_id,
        deploy_id = %attempt.deploy_id,
        "Deploy triggered, handing over to monitor"
    );
    if let Err(e) = state.monitor_queue.enqueue(attempt) {
        error!(project = %project.id, error = %e, "Failed to schedule deploy monitor");
    }

    Ok(pretty_json(
        StatusCode::OK,
        &PendingResponse {
            message: "Deploy triggered".to_string(),
            project: project.id.clone(),
            service_name,
            service_id,
            status: "pending".to_string(),
        },
    ))
}

fn notify_trigger_failure(state: &ServerState, project: &Project, service_name: &str, reason: String) {
    let notification = DeployNotification::trigger_failed(&project.id, service_name, reason);
    if let Err(e) = state.monitor_queue.enqueue_notification(notification) {
        error!(project = %project.id, error = %e, "Failed to schedule failure notification");
    }
}

/// `application/json` or any `application/*+json` media type
fn is_json_request(headers: &HeaderMap) -> bool {
    let Some(value) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };

    let mime = value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

/// The body must be a JSON object with a `push_data` key
fn check_payload(body: &[u8]) -> Result<(), WebhookError> {
    let payload: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| WebhookError::InvalidPayload(format!("body is not JSON: {}", e)))?;

    match payload.as_object() {
        Some(object) if object.contains_key("push_data") => Ok(()),
        _ => {
            warn!("Rejected webhook without push_data");
            Err(WebhookError::InvalidPayload("push_data is required".to_string()))
        }
    }
}
