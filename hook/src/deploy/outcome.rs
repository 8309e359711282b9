//! Terminal result of monitoring a deploy

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::deploy::fsm::{MonitorFsm, MonitorState};

/// Public URLs of a service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceUrls {
    /// Platform assigned URL, e.g. `https://app.onrender.com`
    pub default_url: Option<String>,

    /// Verified custom domains, `https://` prefixed, in API order
    pub custom_domains: Vec<String>,
}

/// How a monitored deploy ended
#[derive(Debug, Clone, Serialize)]
pub struct DeployOutcome {
    pub state: MonitorState,

    /// `finishedAt` reported with the terminal status
    pub finished_at: Option<DateTime<Utc>>,

    /// Failure reason; `None` when live
    pub reason: Option<String>,

    /// Status checks performed
    pub checks: u32,

    /// Resolved only for live deploys
    pub urls: Option<ServiceUrls>,
}

impl DeployOutcome {
    /// Build the outcome from a terminal FSM
    pub fn from_fsm(fsm: &MonitorFsm, finished_at: Option<&str>) -> Self {
        Self {
            state: fsm.state(),
            finished_at: finished_at.and_then(parse_finished_at),
            reason: fsm.reason().map(str::to_string),
            checks: fsm.checks(),
            urls: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.state.is_success()
    }
}

fn parse_finished_at(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            warn!(finished_at = raw, error = %e, "Unparseable deploy completion time");
            None
        }
    }
}
