//! Notification sinks

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::HookError;
use crate::notify::message::DeployNotification;
use crate::notify::Notifier;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Writes notifications to the log only
#[derive(Debug, Clone)]
pub struct LogNotifier {
    prefer_custom_domain: bool,
}

impl LogNotifier {
    pub fn new(prefer_custom_domain: bool) -> Self {
        Self { prefer_custom_domain }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &DeployNotification) -> Result<(), HookError> {
        let title = notification.title();
        let content = notification.content(self.prefer_custom_domain);
        if notification.success {
            info!(project = %notification.project, status = %notification.status, "{}\n{}", title, content);
        } else {
            warn!(project = %notification.project, status = %notification.status, "{}\n{}", title, content);
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    title: &'a str,
    content: &'a str,
}

/// POSTs `{"title", "content"}` JSON to a webhook URL
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: Url,
    prefer_custom_domain: bool,
}

impl WebhookNotifier {
    pub fn new(url: Url, prefer_custom_domain: bool) -> Result<Self, HookError> {
        let client = Client::builder().timeout(SEND_TIMEOUT).build()?;
        Ok(Self {
            client,
            url,
            prefer_custom_domain,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &DeployNotification) -> Result<(), HookError> {
        let title = notification.title();
        let content = notification.content(self.prefer_custom_domain);

        let response = self
            .client
            .post(self.url.clone())
            .json(&WebhookMessage {
                title: &title,
                content: &content,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HookError::NotifyError(format!(
                "notification sink answered {}: {}",
                status, body
            )));
        }

        debug!(project = %notification.project, "Notification delivered");
        Ok(())
    }
}
