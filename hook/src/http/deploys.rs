//! Deploy trigger and status polling

use std::future::Future;
use std::time::Duration;

use render_api::Deploy;
use reqwest::StatusCode;
use secrecy::SecretString;
use tracing::{debug, error, info, warn};

use crate::deploy::fsm::{DeployStatus, MonitorEvent, MonitorFsm};
use crate::deploy::outcome::DeployOutcome;
use crate::errors::ApiError;
use crate::http::client::RenderClient;

/// Polling limits
#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    /// Maximum number of status checks
    pub max_attempts: u32,

    /// Delay between two checks
    pub interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            interval: Duration::from_secs(60),
        }
    }
}

impl RenderClient {
    /// Start a deploy of `service_id`; only `201 Created` counts as success
    pub async fn trigger_deploy(
        &self,
        service_id: &str,
        api_key: &SecretString,
    ) -> Result<Deploy, ApiError> {
        let path = format!("/services/{}/deploys", service_id);
        let deploy: Deploy = self.post_empty(&path, api_key, StatusCode::CREATED).await?;
        info!(service_id, deploy_id = %deploy.id, "Deploy triggered");
        Ok(deploy)
    }

    /// Fetch a single deploy
    pub async fn get_deploy(
        &self,
        service_id: &str,
        deploy_id: &str,
        api_key: &SecretString,
    ) -> Result<Deploy, ApiError> {
        let path = format!("/services/{}/deploys/{}", service_id, deploy_id);
        self.get(&path, api_key, &[]).await
    }

    /// Poll a deploy until it reaches a terminal status
    pub async fn poll_deploy_status(
        &self,
        service_id: &str,
        deploy_id: &str,
        api_key: &SecretString,
        options: PollOptions,
    ) -> DeployOutcome {
        self.poll_deploy_status_with(service_id, deploy_id, api_key, options, tokio::time::sleep)
            .await
    }

    /// [`RenderClient::poll_deploy_status`] with an injectable sleep.
    ///
    /// Unknown statuses count as in progress. A failed check ends polling at
    /// once with a timed out outcome; there is no per-check retry.
    pub async fn poll_deploy_status_with<S, F>(
        &self,
        service_id: &str,
        deploy_id: &str,
        api_key: &SecretString,
        options: PollOptions,
        sleep_fn: S,
    ) -> DeployOutcome
    where
        S: Fn(Duration) -> F,
        F: Future<Output = ()>,
    {
        let mut fsm = MonitorFsm::new();

        while fsm.checks() < options.max_attempts {
            let deploy = match self.get_deploy(service_id, deploy_id, api_key).await {
                Ok(deploy) => deploy,
                Err(e) => {
                    error!(service_id, deploy_id, error = %e, "Failed to fetch deploy status");
                    advance(&mut fsm, MonitorEvent::CheckFailed(format!("status check failed: {}", e)));
                    return DeployOutcome::from_fsm(&fsm, None);
                }
            };

            let status = DeployStatus::parse(deploy.status.as_deref().unwrap_or_default());
            advance(&mut fsm, MonitorEvent::Observed(status.clone()));

            if fsm.state().is_terminal() {
                info!(
                    service_id,
                    deploy_id,
                    status = status.as_str(),
                    checks = fsm.checks(),
                    "Deploy reached terminal status"
                );
                return DeployOutcome::from_fsm(&fsm, deploy.finished_at.as_deref());
            }

            debug!(
                service_id,
                deploy_id,
                status = status.as_str(),
                check = fsm.checks(),
                max_attempts = options.max_attempts,
                "Deploy still in progress"
            );

            if fsm.checks() < options.max_attempts {
                sleep_fn(options.interval).await;
            }
        }

        warn!(
            service_id,
            deploy_id,
            checks = fsm.checks(),
            "Timed out waiting for deploy"
        );
        advance(&mut fsm, MonitorEvent::AttemptsExhausted);
        DeployOutcome::from_fsm(&fsm, None)
    }
}

fn advance(fsm: &mut MonitorFsm, event: MonitorEvent) {
    if let Err(e) = fsm.process(event) {
        error!("Deploy monitor rejected event: {}", e);
    }
}
