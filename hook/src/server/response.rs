//! JSON response helpers

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

pub const JSON_UTF8: &str = "application/json; charset=utf-8";

const FALLBACK_BODY: &str = "{\n  \"error\": \"Internal server error\",\n  \"status\": \"error\"\n}";

/// Pretty printed JSON with an explicit UTF-8 charset
pub fn pretty_json<T: Serialize>(status: StatusCode, body: &T) -> Response {
    let content_type = [(header::CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8))];
    match serde_json::to_string_pretty(body) {
        Ok(text) => (status, content_type, text).into_response(),
        Err(e) => {
            error!("Failed to serialize response body: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, content_type, FALLBACK_BODY).into_response()
        }
    }
}
