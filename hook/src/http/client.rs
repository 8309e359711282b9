//! HTTP client implementation

use std::time::Duration;

use reqwest::{header, Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::errors::{ApiError, HookError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the Render API.
///
/// Every call is authenticated with the project's API key and reports
/// failures as [`ApiError`] values instead of panicking.
#[derive(Debug, Clone)]
pub struct RenderClient {
    client: Client,
    base_url: String,
}

impl RenderClient {
    /// Create a new client for `base_url`, e.g. `https://api.render.com/v1`
    pub fn new(base_url: &str) -> Result<Self, HookError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn authorized(&self, builder: RequestBuilder, api_key: &SecretString) -> RequestBuilder {
        builder
            .header(header::AUTHORIZATION, format!("Bearer {}", api_key.expose_secret()))
            .header(header::ACCEPT, "application/json")
    }

    /// GET `path` and decode a 2xx JSON body
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        api_key: &SecretString,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let mut builder = self.client.get(&url);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        let request = self.authorized(builder, api_key);
        let response = request.send().await?;
        decode(response, "GET", |status| status.is_success()).await
    }

    /// POST to `path` without a body, accepting only `expected` as success
    pub(crate) async fn post_empty<T: DeserializeOwned>(
        &self,
        path: &str,
        api_key: &SecretString,
        expected: StatusCode,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let request = self.authorized(self.client.post(&url), api_key);
        let response = request.send().await?;
        decode(response, "POST", |status| status == expected).await
    }
}

async fn decode<T, F>(response: reqwest::Response, method: &str, accept: F) -> Result<T, ApiError>
where
    T: DeserializeOwned,
    F: Fn(StatusCode) -> bool,
{
    let status = response.status();
    let body = response.text().await?;

    if !accept(status) {
        error!("HTTP {} failed: {} - {}", method, status, body);
        return Err(ApiError::Status { status, body });
    }

    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}
