//! Deploy gate
//!
//! Two independent checks guard every deploy trigger:
//!
//! 1. a non-blocking per-project lock held across the synchronous
//!    "validate + trigger" section, so concurrent deliveries for one project
//!    never trigger twice;
//! 2. a cooldown window measured from the last *accepted* trigger, persisted
//!    on disk so it holds across workers and restarts.

pub mod cooldown;
pub mod lock;

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::errors::{GateError, HookError};
use crate::gate::cooldown::{remaining_cooldown, CooldownRecords};
use crate::gate::lock::{FileLocks, LockGuard};
use crate::storage::layout::StorageLayout;

/// Serializes and rate-limits deploy attempts per project
#[derive(Debug, Clone)]
pub struct DeployGate {
    locks: FileLocks,
    records: CooldownRecords,
}

impl DeployGate {
    /// Open the gate, creating the locks directory if needed
    pub async fn open(layout: StorageLayout) -> Result<Self, HookError> {
        layout.setup().await?;
        info!(dir = %layout.locks_dir.display(), "Deploy gate ready");
        Ok(Self {
            locks: FileLocks::new(layout.clone()),
            records: CooldownRecords::new(layout),
        })
    }

    /// Take the project's lock without waiting
    pub async fn try_acquire(&self, project: &str) -> Result<LockGuard, GateError> {
        self.locks.try_acquire(project).await
    }

    /// Fail with [`GateError::RateLimited`] while the cooldown window is open
    pub async fn check_cooldown(
        &self,
        project: &str,
        now: DateTime<Utc>,
        interval: Duration,
    ) -> Result<(), GateError> {
        let Some(last) = self.records.last_accepted(project).await? else {
            debug!(project, "No previous deploy recorded");
            return Ok(());
        };

        match remaining_cooldown(last, now, interval) {
            Some(remaining_secs) => Err(GateError::RateLimited {
                project: project.to_string(),
                interval_secs: interval.as_secs(),
                remaining_secs,
            }),
            None => Ok(()),
        }
    }

    /// Record an accepted trigger; must precede the remote trigger call
    pub async fn record_acceptance(
        &self,
        project: &str,
        now: DateTime<Utc>,
    ) -> Result<(), GateError> {
        self.records.record(project, now).await?;
        debug!(project, at = %now.to_rfc3339(), "Deploy acceptance recorded");
        Ok(())
    }

    /// Release a lock taken with [`DeployGate::try_acquire`]
    pub fn release(&self, lock: LockGuard) {
        lock.release();
    }
}
