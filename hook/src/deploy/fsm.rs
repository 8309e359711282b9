//! Finite State Machine for deploy monitoring

use serde::{Deserialize, Serialize};

/// Status reported by the Render API for a deploy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployStatus {
    Live,
    Failed,
    Canceled,
    Deactivated,
    /// Any other status, including ones the API may add later
    InProgress(String),
}

impl DeployStatus {
    /// Classify a raw status by exact match
    pub fn parse(raw: &str) -> Self {
        match raw {
            "live" => DeployStatus::Live,
            "failed" => DeployStatus::Failed,
            "canceled" | "cancelled" => DeployStatus::Canceled,
            "deactivated" => DeployStatus::Deactivated,
            other => DeployStatus::InProgress(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DeployStatus::Live => "live",
            DeployStatus::Failed => "failed",
            DeployStatus::Canceled => "canceled",
            DeployStatus::Deactivated => "deactivated",
            DeployStatus::InProgress(raw) => raw,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeployStatus::InProgress(_))
    }
}

/// Monitor state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    /// Waiting for a terminal status
    Polling,

    /// Deploy is live
    Live,

    /// Deploy failed
    Failed,

    /// Deploy was canceled
    Cancelled,

    /// Service was deactivated
    Deactivated,

    /// No terminal status within the allowed checks, or a check failed
    TimedOut,
}

impl MonitorState {
    pub fn is_terminal(&self) -> bool {
        *self != MonitorState::Polling
    }

    pub fn is_success(&self) -> bool {
        *self == MonitorState::Live
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorState::Polling => "polling",
            MonitorState::Live => "live",
            MonitorState::Failed => "failed",
            MonitorState::Cancelled => "cancelled",
            MonitorState::Deactivated => "deactivated",
            MonitorState::TimedOut => "timed_out",
        }
    }
}

impl std::fmt::Display for MonitorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monitor event
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// A status check returned this status
    Observed(DeployStatus),

    /// A status check could not be completed
    CheckFailed(String),

    /// The last allowed check returned a non-terminal status
    AttemptsExhausted,
}

/// Deploy monitor FSM
#[derive(Debug, Clone)]
pub struct MonitorFsm {
    state: MonitorState,
    reason: Option<String>,
    checks: u32,
}

impl MonitorFsm {
    /// Create a new FSM in polling state
    pub fn new() -> Self {
        Self {
            state: MonitorState::Polling,
            reason: None,
            checks: 0,
        }
    }

    /// Get current state
    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Why the deploy did not go live, if it did not
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Number of status checks observed
    pub fn checks(&self) -> u32 {
        self.checks
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: MonitorEvent) -> Result<(), String> {
        if self.state.is_terminal() {
            return Err(format!(
                "Invalid transition: {:?} -> {:?}",
                self.state, event
            ));
        }

        let new_state = match event {
            MonitorEvent::Observed(status) => {
                self.checks += 1;
                let next = match &status {
                    DeployStatus::Live => MonitorState::Live,
                    DeployStatus::Failed => MonitorState::Failed,
                    DeployStatus::Canceled => MonitorState::Cancelled,
                    DeployStatus::Deactivated => MonitorState::Deactivated,
                    DeployStatus::InProgress(_) => MonitorState::Polling,
                };
                if next.is_terminal() && !next.is_success() {
                    self.reason = Some(status.as_str().to_string());
                }
                next
            }
            MonitorEvent::CheckFailed(err) => {
                self.checks += 1;
                self.reason = Some(err);
                MonitorState::TimedOut
            }
            MonitorEvent::AttemptsExhausted => {
                self.reason = Some(format!(
                    "no terminal status after {} checks",
                    self.checks
                ));
                MonitorState::TimedOut
            }
        };

        self.state = new_state;
        Ok(())
    }
}

impl Default for MonitorFsm {
    fn default() -> Self {
        Self::new()
    }
}
