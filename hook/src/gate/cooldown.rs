//! Last accepted deploy timestamps

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{GateError, HookError};
use crate::storage::layout::StorageLayout;

/// Contents of `<locks_dir>/<project>.status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployRecord {
    pub last_accepted_at: DateTime<Utc>,
}

/// File backed store of [`DeployRecord`]s, one per project
#[derive(Debug, Clone)]
pub struct CooldownRecords {
    layout: StorageLayout,
}

impl CooldownRecords {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    /// Time of the last accepted trigger, `None` if there never was one
    pub async fn last_accepted(&self, project: &str) -> Result<Option<DateTime<Utc>>, GateError> {
        let file = self.layout.status_file(project);
        if !file.exists().await {
            return Ok(None);
        }

        match file.read_json::<DeployRecord>().await {
            Ok(record) => Ok(Some(record.last_accepted_at)),
            Err(HookError::JsonError(e)) => {
                warn!(project, error = %e, "Unreadable deploy record, treating as absent");
                Ok(None)
            }
            Err(e) => Err(storage_error(e)),
        }
    }

    /// Persist `now` as the last accepted trigger
    pub async fn record(&self, project: &str, now: DateTime<Utc>) -> Result<(), GateError> {
        self.layout
            .status_file(project)
            .write_json(&DeployRecord {
                last_accepted_at: now,
            })
            .await
            .map_err(storage_error)
    }
}

fn storage_error(err: HookError) -> GateError {
    match err {
        HookError::IoError(e) => GateError::Io(e),
        other => GateError::Io(std::io::Error::other(other.to_string())),
    }
}

/// Whole seconds left in the cooldown window, `None` once it has elapsed.
///
/// Elapsed time is floored to whole seconds; a record in the future counts
/// as zero elapsed.
pub fn remaining_cooldown(
    last: DateTime<Utc>,
    now: DateTime<Utc>,
    interval: Duration,
) -> Option<u64> {
    let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
    if elapsed < interval {
        Some(interval.as_secs().saturating_sub(elapsed.as_secs()))
    } else {
        None
    }
}
