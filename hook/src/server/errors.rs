//! Webhook failures and their HTTP rendering

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use hook_api::ErrorBody;
use thiserror::Error;
use tracing::error;

use crate::errors::{GateError, HookError};
use crate::server::response::pretty_json;

/// Why a webhook call did not result in a deploy
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Content-Type must be application/json")]
    InvalidContentType,

    #[error("malformed query string: {0}")]
    InvalidQuery(String),

    #[error("missing token")]
    MissingToken,

    #[error("invalid token")]
    InvalidToken,

    #[error("unknown project {0:?}")]
    UnknownProject(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("deployment already in progress for project {0}")]
    Deploying(String),

    #[error("project {project} is rate limited for {remaining_secs}s")]
    RateLimited {
        project: String,
        interval_secs: u64,
        remaining_secs: u64,
    },

    #[error("project {0} has no API key")]
    MissingCredential(String),

    #[error("failed to list services: {0}")]
    ServiceLookup(String),

    #[error("service of project {0} has no id")]
    MissingServiceId(String),

    #[error("failed to trigger deploy: {0}")]
    TriggerFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<GateError> for WebhookError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Busy { project } => WebhookError::Deploying(project),
            GateError::RateLimited {
                project,
                interval_secs,
                remaining_secs,
            } => WebhookError::RateLimited {
                project,
                interval_secs,
                remaining_secs,
            },
            GateError::Io(e) => WebhookError::Internal(e.to_string()),
        }
    }
}

impl From<HookError> for WebhookError {
    fn from(err: HookError) -> Self {
        match err {
            HookError::Gate(e) => e.into(),
            other => WebhookError::Internal(other.to_string()),
        }
    }
}

impl WebhookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidContentType
            | WebhookError::InvalidQuery(_)
            | WebhookError::UnknownProject(_)
            | WebhookError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            WebhookError::MissingToken => StatusCode::UNAUTHORIZED,
            WebhookError::InvalidToken => StatusCode::FORBIDDEN,
            WebhookError::Deploying(_) | WebhookError::RateLimited { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            WebhookError::MissingCredential(_)
            | WebhookError::ServiceLookup(_)
            | WebhookError::MissingServiceId(_)
            | WebhookError::TriggerFailed(_)
            | WebhookError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            WebhookError::InvalidContentType => {
                ErrorBody::new("Invalid Content-Type, application/json is required")
            }
            WebhookError::InvalidQuery(_) => ErrorBody::new("Invalid query string"),
            WebhookError::MissingToken => ErrorBody::new("Missing authentication token"),
            WebhookError::InvalidToken => ErrorBody::new("Invalid token"),
            WebhookError::UnknownProject(_) => ErrorBody::new("Invalid project name"),
            WebhookError::InvalidPayload(_) => ErrorBody::new("Invalid payload"),
            WebhookError::Deploying(project) => ErrorBody::new("Deployment in progress")
                .with_details(format!(
                    "Project {} is already deploying, wait for the current deploy to finish",
                    project
                ))
                .with_status("deploying"),
            WebhookError::RateLimited {
                project,
                interval_secs,
                remaining_secs,
            } => ErrorBody::new("Too many deploy requests")
                .with_details(format!(
                    "Project {} may deploy once every {} seconds",
                    project, interval_secs
                ))
                .with_retry_after(*remaining_secs)
                .with_status("rate_limited"),
            WebhookError::MissingCredential(project) => {
                ErrorBody::new("Project is not configured")
                    .with_details(format!("Project {} has no API key", project))
                    .with_status("error")
            }
            WebhookError::ServiceLookup(details) => {
                ErrorBody::new("Failed to list services").with_details(details.clone())
            }
            WebhookError::MissingServiceId(project) => ErrorBody::new("Unable to get service id")
                .with_details(format!("The first service of project {} has no id", project)),
            WebhookError::TriggerFailed(details) => {
                ErrorBody::new("Failed to trigger deploy").with_details(details.clone())
            }
            WebhookError::Internal(details) => ErrorBody::new("Internal server error")
                .with_details(details.clone())
                .with_status("error"),
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Webhook failed: {}", self);
        }

        let mut response = pretty_json(status, &self.body());
        if let WebhookError::RateLimited { remaining_secs, .. } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(remaining_secs));
        }
        response
    }
}
