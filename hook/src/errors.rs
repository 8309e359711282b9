//! Error types for renderhook

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for renderhook
#[derive(Error, Debug)]
pub enum HookError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("Notification error: {0}")]
    NotifyError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Rejections produced by the deploy gate
#[derive(Error, Debug)]
pub enum GateError {
    /// Another attempt holds the project's lock
    #[error("deployment already in progress for project {project}")]
    Busy { project: String },

    /// The cooldown window since the last accepted trigger has not elapsed
    #[error("project {project} may deploy once every {interval_secs}s, retry in {remaining_secs}s")]
    RateLimited {
        project: String,
        interval_secs: u64,
        remaining_secs: u64,
    },

    #[error("gate storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a call to the remote deploy API
#[derive(Error, Debug)]
pub enum ApiError {
    /// The API answered with an unexpected status
    #[error("{status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The request never produced a response
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not have the expected shape
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// HTTP status returned by the API, when there was one
    pub fn http_status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
