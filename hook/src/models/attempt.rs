//! A triggered deploy handed to the monitor

use secrecy::SecretString;

use crate::utils::generate_uuid;

/// Everything a monitor needs to follow one triggered deploy.
///
/// Captured by the webhook handler at trigger time and moved into the
/// monitor task, which owns it exclusively from then on.
#[derive(Debug)]
pub struct DeployAttempt {
    /// Correlates the log lines of one attempt
    pub attempt_id: String,

    /// Project identifier
    pub project: String,

    /// Remote service identifier
    pub service_id: String,

    /// Remote service display name
    pub service_name: String,

    /// Identifier of the triggered deploy
    pub deploy_id: String,

    api_key: SecretString,
}

impl DeployAttempt {
    pub fn new(
        project: impl Into<String>,
        service_id: impl Into<String>,
        service_name: impl Into<String>,
        deploy_id: impl Into<String>,
        api_key: SecretString,
    ) -> Self {
        Self {
            attempt_id: generate_uuid(),
            project: project.into(),
            service_id: service_id.into(),
            service_name: service_name.into(),
            deploy_id: deploy_id.into(),
            api_key,
        }
    }

    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }
}
