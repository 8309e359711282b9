//! Notification content

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::deploy::outcome::{DeployOutcome, ServiceUrls};
use crate::models::attempt::DeployAttempt;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Status reported when the remote API refused to start the deploy
pub const TRIGGER_FAILED: &str = "trigger_failed";

/// What happened to one deploy, ready to be rendered
#[derive(Debug, Clone, Serialize)]
pub struct DeployNotification {
    pub project: String,
    pub service_name: String,

    /// `None` when the deploy was never created
    pub deploy_id: Option<String>,

    /// Terminal monitor state, or [`TRIGGER_FAILED`]
    pub status: String,
    pub success: bool,
    pub reason: Option<String>,
    pub urls: Option<ServiceUrls>,
    pub finished_at: Option<DateTime<Utc>>,
    pub notified_at: DateTime<Utc>,
}

impl DeployNotification {
    /// Notification for a monitored deploy
    pub fn from_outcome(attempt: &DeployAttempt, outcome: &DeployOutcome) -> Self {
        Self {
            project: attempt.project.clone(),
            service_name: attempt.service_name.clone(),
            deploy_id: Some(attempt.deploy_id.clone()),
            status: outcome.state.as_str().to_string(),
            success: outcome.is_success(),
            reason: outcome.reason.clone(),
            urls: outcome.urls.clone(),
            finished_at: outcome.finished_at,
            notified_at: Utc::now(),
        }
    }

    /// Notification for a trigger the remote API rejected
    pub fn trigger_failed(project: &str, service_name: &str, reason: impl Into<String>) -> Self {
        Self {
            project: project.to_string(),
            service_name: service_name.to_string(),
            deploy_id: None,
            status: TRIGGER_FAILED.to_string(),
            success: false,
            reason: Some(reason.into()),
            urls: None,
            finished_at: None,
            notified_at: Utc::now(),
        }
    }

    pub fn title(&self) -> String {
        if self.success {
            format!("Render deploy succeeded: {}", self.service_name)
        } else {
            format!("Render deploy failed: {}", self.service_name)
        }
    }

    /// Markdown body
    pub fn content(&self, prefer_custom_domain: bool) -> String {
        let mut lines = vec![
            format!("### Project: {}", self.project),
            format!("**Service**: {}", self.service_name),
            format!("**Status**: {}", self.status),
            format!("**Deploy ID**: {}", self.deploy_id.as_deref().unwrap_or("-")),
        ];

        if let Some(reason) = &self.reason {
            lines.push(format!("**Reason**: {}", reason));
        }

        if let Some(urls) = &self.urls {
            let shown = display_urls(urls, prefer_custom_domain);
            if !shown.is_empty() {
                lines.push(format!("**URL**: {}", shown.join(" | ")));
            }
        }

        if let Some(finished_at) = self.finished_at {
            lines.push(format!(
                "**Finished at**: {}",
                finished_at.with_timezone(&Local).format(TIME_FORMAT)
            ));
        }

        lines.push(format!(
            "**Time**: {}",
            self.notified_at.with_timezone(&Local).format(TIME_FORMAT)
        ));

        lines.join("\n\n")
    }
}

/// URLs to show: only custom domains when preferred and present, otherwise
/// the default URL followed by the custom domains
pub fn display_urls(urls: &ServiceUrls, prefer_custom_domain: bool) -> Vec<String> {
    if prefer_custom_domain && !urls.custom_domains.is_empty() {
        return urls.custom_domains.clone();
    }
    urls.default_url
        .iter()
        .chain(urls.custom_domains.iter())
        .cloned()
        .collect()
}
