//! Background deploy monitor
//!
//! Follows one triggered deploy to a terminal state, resolves the service
//! URLs when it went live, and emits exactly one notification.

use std::sync::Arc;

use tracing::{error, info, info_span, warn, Instrument};

use crate::deploy::outcome::DeployOutcome;
use crate::http::client::RenderClient;
use crate::http::deploys::PollOptions;
use crate::models::attempt::DeployAttempt;
use crate::notify::message::DeployNotification;
use crate::notify::Notifier;

/// Polls deploys and reports their outcome
pub struct DeployMonitor {
    client: RenderClient,
    notifier: Arc<dyn Notifier>,
    poll: PollOptions,
}

impl DeployMonitor {
    pub fn new(client: RenderClient, notifier: Arc<dyn Notifier>, poll: PollOptions) -> Self {
        Self {
            client,
            notifier,
            poll,
        }
    }

    /// Watch `attempt` until it ends and notify once
    pub async fn watch(&self, attempt: DeployAttempt) -> DeployOutcome {
        let span = info_span!(
            "deploy_monitor",
            attempt_id = %attempt.attempt_id,
            project = %attempt.project,
            service_id = %attempt.service_id,
            deploy_id = %attempt.deploy_id,
        );
        self.watch_inner(attempt).instrument(span).await
    }

    async fn watch_inner(&self, attempt: DeployAttempt) -> DeployOutcome {
        info!(
            service_name = %attempt.service_name,
            max_attempts = self.poll.max_attempts,
            interval_secs = self.poll.interval.as_secs(),
            "Monitoring deploy"
        );

        let mut outcome = self
            .client
            .poll_deploy_status(
                &attempt.service_id,
                &attempt.deploy_id,
                attempt.api_key(),
                self.poll,
            )
            .await;

        if outcome.is_success() {
            info!(checks = outcome.checks, "Deploy is live");
            outcome.urls = self
                .client
                .resolve_service_urls(&attempt.service_id, attempt.api_key())
                .await;
        } else {
            error!(
                state = %outcome.state,
                reason = outcome.reason.as_deref().unwrap_or("-"),
                checks = outcome.checks,
                "Deploy did not go live"
            );
        }

        self.notify(&DeployNotification::from_outcome(&attempt, &outcome))
            .await;

        info!(state = %outcome.state, "Deploy monitoring finished");
        outcome
    }

    /// Send `notification`; a delivery failure is logged and dropped
    pub async fn notify(&self, notification: &DeployNotification) {
        if let Err(e) = self.notifier.send(notification).await {
            warn!(
                project = %notification.project,
                status = %notification.status,
                error = %e,
                "Failed to send deploy notification"
            );
        }
    }
}
